//! Place metadata and review harvesting from map listing pages, driven
//! through a real browser over WebDriver.

pub mod acquire;
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod extract;
pub mod lexicon;
pub mod pipeline;
pub mod place;
pub mod reviews;
pub mod snapshot;
pub mod webdriver;

pub use config::{Pacing, RunConfig};
pub use driver::{ElementId, Key, PageDriver, WaitCondition};
pub use error::{DriverError, ScrapeError};
pub use pipeline::{RunReport, run};
