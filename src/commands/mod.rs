// Continuous delivery of a project
pub mod deliver;

// Repository archives
pub mod pack;

// Single service operations
pub mod service;
