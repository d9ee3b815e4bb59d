pub mod dataset;
pub mod fetch;
pub mod run;
pub mod status;

pub use dataset::push;
pub use fetch::fetch;
pub use run::run;
pub use status::status;
