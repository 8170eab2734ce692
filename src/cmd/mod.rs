pub mod run;
pub mod sleep;
