pub mod notificationmodel;
pub mod ordermodel;
pub mod usermodel;
pub mod walletmodels;
