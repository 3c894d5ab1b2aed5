pub mod aktools;
pub mod serverchan;
pub mod util;
