pub mod db;
pub mod escrowdb;
pub mod orderdb;
pub mod userdb;
pub mod walletdb;
pub mod withdrawaldb;
