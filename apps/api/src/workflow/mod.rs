//! Résumé/JD match workflow: upload both files, run the vendor workflow,
//! poll its status. All vendor HTTP goes through `crate::vendor`.

pub mod decode;
pub mod error;
pub mod handlers;
pub mod models;
pub mod poller;
pub mod submitter;
pub mod transport;
