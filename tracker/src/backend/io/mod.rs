//! # IO Module
//!
//! Adapter layer between HTTP callers and the domain. Handlers translate
//! requests into repository calls and repository errors into status codes;
//! no business rule lives here.
//!
//! ## Supported Operations
//!
//! - **GET/POST /api/categories**, **PUT/DELETE /api/categories/:id**
//! - **GET/POST /api/expenses**, **PUT/DELETE /api/expenses/:id**
//! - **GET /api/reports/summary**
//! - **GET /api/health**

pub mod rest;
