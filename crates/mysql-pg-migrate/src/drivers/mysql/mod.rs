//! MySQL/MariaDB source driver.
//!
//! [`MysqlReader`] holds one `mysql_async` connection and streams query
//! results row by row over the text protocol.
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod reader;

pub use reader::MysqlReader;
