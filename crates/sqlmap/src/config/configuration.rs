use super::settings::Settings;
use crate::backend::Transaction;
use crate::builder::ParameterType;
use crate::error::{MapperError, MapperResult};
use crate::executor::{Executor, ExecutorType};
use crate::mapping::{MappedStatement, MappedStatementBuilder, SqlCommandType};
use crate::monitor::{NoopMonitor, QueryMonitor};
use crate::reflection::{ReflectorFactory, TypeDesc};
use crate::scripting::{DefaultEvaluator, ExpressionEvaluator, LanguageDriver, XmlLanguageDriver};
use crate::session::SqlSession;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything statements need at runtime: settings, the accessor cache, the
/// expression evaluator, the language driver, the registered statements and
/// the query monitor.
///
/// Build it once, register statements, then share it behind an `Arc`.
pub struct Configuration {
    settings: Settings,
    reflector_factory: Arc<ReflectorFactory>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    language_driver: Arc<dyn LanguageDriver>,
    mapped_statements: HashMap<String, Arc<MappedStatement>>,
    type_aliases: HashMap<String, TypeDesc>,
    monitor: Arc<dyn QueryMonitor>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.mapped_statements.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("Configuration")
            .field("settings", &self.settings)
            .field("mapped_statements", &ids)
            .finish_non_exhaustive()
    }
}

impl Configuration {
    pub fn new(settings: Settings) -> Self {
        let reflector_factory = ReflectorFactory::new();
        reflector_factory.set_class_cache_enabled(settings.class_cache_enabled);
        let evaluator = DefaultEvaluator::with_capacity(settings.expression_cache_capacity);

        let mut configuration = Self {
            settings,
            reflector_factory: Arc::new(reflector_factory),
            evaluator: Arc::new(evaluator),
            language_driver: Arc::new(XmlLanguageDriver),
            mapped_statements: HashMap::new(),
            type_aliases: HashMap::new(),
            monitor: Arc::new(NoopMonitor),
        };
        configuration.register_builtin_aliases();
        configuration
    }

    fn register_builtin_aliases(&mut self) {
        let builtins: [(&[&str], TypeDesc); 10] = [
            (&["string", "text", "varchar"], TypeDesc::text()),
            (&["int", "integer", "long", "short", "byte"], TypeDesc::integer()),
            (&["double", "float", "decimal", "bigdecimal"], TypeDesc::float()),
            (&["boolean", "bool"], TypeDesc::boolean()),
            (&["date", "timestamp", "datetime"], TypeDesc::timestamp()),
            (&["uuid"], TypeDesc::uuid()),
            (&["json"], TypeDesc::json()),
            (&["list", "arraylist", "collection"], TypeDesc::list()),
            (&["map", "hashmap"], TypeDesc::map()),
            (&["object"], TypeDesc::object()),
        ];
        for (aliases, ty) in builtins {
            for alias in aliases {
                self.type_aliases.insert((*alias).to_string(), ty.clone());
            }
        }
        for alias in ["bytes", "byte[]"] {
            self.type_aliases.insert(alias.to_string(), TypeDesc::bytes());
        }
    }

    pub fn with_monitor(self, monitor: impl QueryMonitor + 'static) -> Self {
        self.with_monitor_arc(Arc::new(monitor))
    }

    pub fn with_monitor_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl ExpressionEvaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    pub fn with_language_driver(mut self, driver: impl LanguageDriver + 'static) -> Self {
        self.language_driver = Arc::new(driver);
        self
    }

    /// Share one accessor cache between several configurations.
    pub fn with_reflector_factory(mut self, factory: Arc<ReflectorFactory>) -> Self {
        self.reflector_factory = factory;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reflector_factory(&self) -> &ReflectorFactory {
        &self.reflector_factory
    }

    pub fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.evaluator.as_ref()
    }

    pub fn language_driver(&self) -> &dyn LanguageDriver {
        self.language_driver.as_ref()
    }

    pub fn monitor(&self) -> &Arc<dyn QueryMonitor> {
        &self.monitor
    }

    /// Register a name usable in `javaType=` placeholder attributes.
    /// Aliases are case-insensitive.
    pub fn register_type_alias(&mut self, alias: &str, ty: TypeDesc) {
        self.type_aliases.insert(alias.to_ascii_lowercase(), ty);
    }

    pub fn resolve_type_alias(&self, alias: &str) -> MapperResult<TypeDesc> {
        self.type_aliases
            .get(&alias.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| {
                MapperError::configuration(format!(
                    "Could not resolve type alias '{alias}'"
                ))
            })
    }

    pub fn add_mapped_statement(&mut self, statement: MappedStatement) -> MapperResult<()> {
        if self.mapped_statements.contains_key(statement.id()) {
            return Err(MapperError::configuration(format!(
                "Mapped Statements collection already contains value for {}",
                statement.id()
            )));
        }
        tracing::debug!(
            target: "sqlmap",
            id = statement.id(),
            dynamic = statement.sql_source().is_dynamic(),
            "registered mapped statement"
        );
        self.mapped_statements
            .insert(statement.id().to_string(), Arc::new(statement));
        Ok(())
    }

    /// Parse `script` with the language driver and register it under `id`
    /// with default execution hints.
    pub fn add_statement(
        &mut self,
        id: &str,
        command_type: SqlCommandType,
        script: &str,
    ) -> MapperResult<()> {
        let statement = self
            .build_statement(id, command_type, script, &ParameterType::Object)?
            .build();
        self.add_mapped_statement(statement)
    }

    /// Parse `script` into a statement builder for hints such as timeout or
    /// fetch size. `parameter_type` types the placeholders of raw sources.
    pub fn build_statement(
        &self,
        id: &str,
        command_type: SqlCommandType,
        script: &str,
        parameter_type: &ParameterType,
    ) -> MapperResult<MappedStatementBuilder> {
        let source = self
            .language_driver
            .create_sql_source(self, script, parameter_type)
            .map_err(|e| match e {
                MapperError::Configuration(message) => MapperError::configuration(format!(
                    "Error parsing statement '{id}'. Cause: {message}"
                )),
                other => other,
            })?;
        Ok(MappedStatement::builder(id, command_type, source))
    }

    pub fn mapped_statement(&self, id: &str) -> MapperResult<Arc<MappedStatement>> {
        self.mapped_statements.get(id).cloned().ok_or_else(|| {
            MapperError::not_found(format!(
                "Mapped Statements collection does not contain value for {id}"
            ))
        })
    }

    pub fn has_statement(&self, id: &str) -> bool {
        self.mapped_statements.contains_key(id)
    }

    pub fn statement_ids(&self) -> impl Iterator<Item = &str> {
        self.mapped_statements.keys().map(String::as_str)
    }

    /// An executor over `transaction`; `executor_type` falls back to the
    /// configured default.
    pub fn new_executor(
        self: &Arc<Self>,
        transaction: Box<dyn Transaction>,
        executor_type: Option<ExecutorType>,
    ) -> Executor {
        let executor_type = executor_type.unwrap_or(self.settings.default_executor_type);
        Executor::new(Arc::clone(self), transaction, executor_type)
    }

    /// A session over `transaction`. With `auto_commit` set, `commit` and
    /// `rollback` only act when forced.
    pub fn open_session(
        self: &Arc<Self>,
        transaction: Box<dyn Transaction>,
        executor_type: Option<ExecutorType>,
        auto_commit: bool,
    ) -> SqlSession {
        SqlSession::new(
            Arc::clone(self),
            self.new_executor(transaction, executor_type),
            auto_commit,
        )
    }
}
