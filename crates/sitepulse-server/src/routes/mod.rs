pub mod analytics;
pub mod health;
pub mod pixel;
pub mod sites;
pub mod track;
