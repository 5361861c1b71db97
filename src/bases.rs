pub mod assignment;
pub mod catalog;
pub mod distances;
pub mod manager;
pub mod site;
