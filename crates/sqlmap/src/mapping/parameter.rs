use crate::error::{MapperError, MapperResult};
use crate::reflection::TypeDesc;
use std::fmt;
use std::str::FromStr;

/// Direction of a bound parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

impl FromStr for ParameterMode {
    type Err = MapperError;

    fn from_str(s: &str) -> MapperResult<Self> {
        match s {
            "IN" => Ok(ParameterMode::In),
            "OUT" => Ok(ParameterMode::Out),
            "INOUT" => Ok(ParameterMode::InOut),
            other => Err(MapperError::configuration(format!(
                "Error resolving ParameterMode. Cause: no mode named '{other}'"
            ))),
        }
    }
}

macro_rules! jdbc_types {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Backend type hint carried by a parameter mapping.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
        pub enum JdbcType {
            $(#[serde(rename = $name)] $variant,)*
        }

        impl JdbcType {
            pub fn name(self) -> &'static str {
                match self {
                    $(JdbcType::$variant => $name,)*
                }
            }
        }

        impl FromStr for JdbcType {
            type Err = MapperError;

            fn from_str(s: &str) -> MapperResult<Self> {
                match s {
                    $($name => Ok(JdbcType::$variant),)*
                    other => Err(MapperError::configuration(format!(
                        "Error resolving JdbcType. Cause: no JdbcType named '{other}'"
                    ))),
                }
            }
        }
    };
}

jdbc_types! {
    Array => "ARRAY",
    Bigint => "BIGINT",
    Binary => "BINARY",
    Bit => "BIT",
    Blob => "BLOB",
    Boolean => "BOOLEAN",
    Char => "CHAR",
    Clob => "CLOB",
    Cursor => "CURSOR",
    Date => "DATE",
    Decimal => "DECIMAL",
    Double => "DOUBLE",
    Float => "FLOAT",
    Integer => "INTEGER",
    Json => "JSON",
    LongVarchar => "LONGVARCHAR",
    Null => "NULL",
    Numeric => "NUMERIC",
    Nvarchar => "NVARCHAR",
    Other => "OTHER",
    Real => "REAL",
    Smallint => "SMALLINT",
    Time => "TIME",
    Timestamp => "TIMESTAMP",
    TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
    Tinyint => "TINYINT",
    Undefined => "UNDEFINED",
    Uuid => "UUID",
    Varbinary => "VARBINARY",
    Varchar => "VARCHAR",
}

impl fmt::Display for JdbcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How one positional marker is bound: which property supplies the value
/// and the type hints attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterMapping {
    property: String,
    mode: ParameterMode,
    java_type: TypeDesc,
    jdbc_type: Option<JdbcType>,
    jdbc_type_name: Option<String>,
    numeric_scale: Option<u32>,
    result_map_id: Option<String>,
    type_handler: Option<String>,
}

impl ParameterMapping {
    pub fn builder(property: impl Into<String>, java_type: TypeDesc) -> ParameterMappingBuilder {
        ParameterMappingBuilder {
            mapping: ParameterMapping {
                property: property.into(),
                mode: ParameterMode::In,
                java_type,
                jdbc_type: None,
                jdbc_type_name: None,
                numeric_scale: None,
                result_map_id: None,
                type_handler: None,
            },
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn mode(&self) -> ParameterMode {
        self.mode
    }

    /// Resolved value type of the property.
    pub fn java_type(&self) -> &TypeDesc {
        &self.java_type
    }

    pub fn jdbc_type(&self) -> Option<JdbcType> {
        self.jdbc_type
    }

    pub fn jdbc_type_name(&self) -> Option<&str> {
        self.jdbc_type_name.as_deref()
    }

    pub fn numeric_scale(&self) -> Option<u32> {
        self.numeric_scale
    }

    pub fn result_map_id(&self) -> Option<&str> {
        self.result_map_id.as_deref()
    }

    pub fn type_handler(&self) -> Option<&str> {
        self.type_handler.as_deref()
    }
}

#[must_use]
pub struct ParameterMappingBuilder {
    mapping: ParameterMapping,
}

impl ParameterMappingBuilder {
    pub fn mode(mut self, mode: ParameterMode) -> Self {
        self.mapping.mode = mode;
        self
    }

    pub fn java_type(mut self, java_type: TypeDesc) -> Self {
        self.mapping.java_type = java_type;
        self
    }

    pub fn jdbc_type(mut self, jdbc_type: JdbcType) -> Self {
        self.mapping.jdbc_type = Some(jdbc_type);
        self
    }

    pub fn jdbc_type_name(mut self, name: impl Into<String>) -> Self {
        self.mapping.jdbc_type_name = Some(name.into());
        self
    }

    pub fn numeric_scale(mut self, scale: u32) -> Self {
        self.mapping.numeric_scale = Some(scale);
        self
    }

    pub fn result_map_id(mut self, id: impl Into<String>) -> Self {
        self.mapping.result_map_id = Some(id.into());
        self
    }

    pub fn type_handler(mut self, alias: impl Into<String>) -> Self {
        self.mapping.type_handler = Some(alias.into());
        self
    }

    pub fn build(self) -> ParameterMapping {
        self.mapping
    }
}
