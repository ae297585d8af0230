//! # sqlmap
//!
//! Mapped SQL statements with dynamic templates, for Rust.
//!
//! ## Features
//!
//! - **Dynamic SQL**: XML-style templates with `<if>`, `<choose>`, `<where>`,
//!   `<set>`, `<trim>`, `<foreach>` and `<bind>`, plus `${}` text substitution
//! - **Placeholder binding**: `#{property,jdbcType=...}` markers become
//!   positional parameters resolved against the parameter object
//! - **Property access**: structs expose properties through `#[derive(Bean)]`
//!   or a hand-written [`ClassDef`](reflection::ClassDef)
//! - **Execution strategies**: simple, statement-reusing and batching
//!   executors over a pluggable [`backend`]
//! - **Query monitoring**: timing, slow-query and batch hooks
//!
//! ## Example
//!
//! ```ignore
//! use sqlmap::{Configuration, ExecutorType, PlaceholderStyle, Settings, Value};
//! use sqlmap::backend::ConnectionTransaction;
//! use sqlmap::backend::postgres::PgConnection;
//! use sqlmap::mapping::SqlCommandType;
//! use std::sync::Arc;
//!
//! let mut config = Configuration::new(Settings::default().placeholder_style(PlaceholderStyle::Dollar));
//! config.add_statement(
//!     "findUsers",
//!     SqlCommandType::Select,
//!     r#"<script>select * from users
//!          <where>
//!            <if test="name != null">name = #{name}</if>
//!            <if test="ids != null">and id in
//!              <foreach collection="ids" item="id" open="(" separator="," close=")">#{id}</foreach>
//!            </if>
//!          </where>
//!        </script>"#,
//! )?;
//!
//! let config = Arc::new(config);
//! let connection = PgConnection::connect("postgres://postgres@localhost/app")?;
//! let mut session = config.open_session(
//!     Box::new(ConnectionTransaction::new(connection)),
//!     Some(ExecutorType::Reuse),
//!     false,
//! );
//! let rows = session.select_list("findUsers", Value::map([("name", "alice")]))?;
//! ```

extern crate self as sqlmap;

pub mod backend;
pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod monitor;
pub mod reflection;
pub mod scripting;
pub mod session;
pub mod value;

pub use backend::{Connection, ConnectionTransaction, ResultSet, Row, Statement, Transaction};
pub use builder::{ParameterType, SqlSourceBuilder};
pub use config::{Configuration, PlaceholderStyle, Settings};
pub use error::{MapperError, MapperResult};
pub use executor::{BatchResult, Executor, ExecutorType};
pub use mapping::{
    BoundSql, JdbcType, MappedStatement, ParameterMapping, ParameterMode, RowBounds,
    SqlCommandType,
};
pub use monitor::{
    CompositeMonitor, NoopMonitor, QueryContext, QueryMonitor, QueryResult, QueryStats, QueryType,
    StatsMonitor, TracingMonitor,
};
pub use reflection::{Bean, ClassDef, MetaObject, Reflector, ReflectorFactory, TypeDesc};
pub use scripting::{DynamicContext, LanguageDriver, SqlNode, SqlSource, XmlLanguageDriver};
pub use session::SqlSession;
pub use value::{FromValue, Value};

#[cfg(feature = "derive")]
pub use sqlmap_derive::Bean;
