#[macro_use]
extern crate lazy_static;

pub mod export;
pub mod roam;
pub mod scrape;
pub mod store;
pub mod update;
