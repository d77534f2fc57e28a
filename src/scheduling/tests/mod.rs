mod common;
mod occurrences;
mod routing;
