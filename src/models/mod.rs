// Data models for the Fabric REST API

pub mod fabric;
