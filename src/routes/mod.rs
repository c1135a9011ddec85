pub(crate) mod health;
pub(crate) mod ia;
pub(crate) mod reports;

use chrono::{Local, NaiveDate};

/// Calendar date used to resolve default report windows.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}
