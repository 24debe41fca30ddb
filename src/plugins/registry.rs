use crate::plugins::parser::{FilterParser, MatchAllParser, ParserContext, QueryParser, MATCH_ALL};
use std::collections::BTreeMap;
use std::sync::Arc;

pub type QueryParserFactory = Box<dyn Fn(&ParserContext) -> Arc<dyn QueryParser> + Send + Sync>;
pub type FilterParserFactory = Box<dyn Fn(&ParserContext) -> Arc<dyn FilterParser> + Send + Sync>;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("a {kind} parser named {name:?} is already registered")]
    DuplicateParser { kind: &'static str, name: String },
    #[error("parser name must not be empty")]
    EmptyName,
}

/// ParserModule collects parser registrations, usually from plugins, before the parsers are
/// built for an index.
pub struct ParserModule {
    query_factories: BTreeMap<String, QueryParserFactory>,
    filter_factories: BTreeMap<String, FilterParserFactory>,
}

impl Default for ParserModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserModule {
    /// Comes with the built-in `match_all` query and filter parsers.
    pub fn new() -> Self {
        let mut module = ParserModule {
            query_factories: BTreeMap::new(),
            filter_factories: BTreeMap::new(),
        };
        module.query_factories.insert(
            MATCH_ALL.to_string(),
            Box::new(|_: &ParserContext| -> Arc<dyn QueryParser> { Arc::new(MatchAllParser) }),
        );
        module.filter_factories.insert(
            MATCH_ALL.to_string(),
            Box::new(|_: &ParserContext| -> Arc<dyn FilterParser> { Arc::new(MatchAllParser) }),
        );

        module
    }

    pub fn add_query_parser<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&ParserContext) -> Arc<dyn QueryParser> + Send + Sync + 'static,
    {
        let name = checked_name(name.into(), "query", |n| self.query_factories.contains_key(n))?;
        self.query_factories.insert(name, Box::new(factory));
        Ok(())
    }

    pub fn add_filter_parser<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&ParserContext) -> Arc<dyn FilterParser> + Send + Sync + 'static,
    {
        let name = checked_name(name.into(), "filter", |n| self.filter_factories.contains_key(n))?;
        self.filter_factories.insert(name, Box::new(factory));
        Ok(())
    }

    /// Runs every factory once for `context`. Besides its registration name, each parser is also
    /// found under the names it reports from `names()`, unless another registration owns that name.
    pub fn build(&self, context: &ParserContext) -> IndexQueryParserService {
        let query_parsers: BTreeMap<String, Arc<dyn QueryParser>> = self
            .query_factories
            .iter()
            .map(|(name, factory)| (name.clone(), factory(context)))
            .collect();
        let filter_parsers: BTreeMap<String, Arc<dyn FilterParser>> = self
            .filter_factories
            .iter()
            .map(|(name, factory)| (name.clone(), factory(context)))
            .collect();

        IndexQueryParserService {
            index: context.index.clone(),
            query_aliases: aliases(&query_parsers, |p| p.names()),
            filter_aliases: aliases(&filter_parsers, |p| p.names()),
            query_parsers,
            filter_parsers,
        }
    }
}

/// Maps every extra name a parser reports to its registration name. First registration (in name
/// order) wins when two parsers report the same alias.
fn aliases<P: ?Sized>(
    parsers: &BTreeMap<String, Arc<P>>,
    names: impl Fn(&P) -> Vec<String>,
) -> BTreeMap<String, String> {
    let mut aliases = BTreeMap::new();
    for (registered, parser) in parsers.iter() {
        for alias in names(&**parser) {
            if !parsers.contains_key(&alias) {
                aliases.entry(alias).or_insert_with(|| registered.clone());
            }
        }
    }
    aliases
}

fn checked_name(
    name: String,
    kind: &'static str,
    taken: impl Fn(&str) -> bool,
) -> Result<String, RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::EmptyName);
    }
    if taken(&name) {
        return Err(RegistryError::DuplicateParser { kind, name });
    }

    Ok(name)
}

/// The parsers built for one index, looked up by registration name.
pub struct IndexQueryParserService {
    index: String,
    query_parsers: BTreeMap<String, Arc<dyn QueryParser>>,
    filter_parsers: BTreeMap<String, Arc<dyn FilterParser>>,
    query_aliases: BTreeMap<String, String>,
    filter_aliases: BTreeMap<String, String>,
}

impl IndexQueryParserService {
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Looks up by registration name, then by any name a parser reports.
    pub fn query_parser(&self, name: &str) -> Option<Arc<dyn QueryParser>> {
        let name = self.query_aliases.get(name).map(|n| n.as_str()).unwrap_or(name);
        self.query_parsers.get(name).cloned()
    }

    pub fn filter_parser(&self, name: &str) -> Option<Arc<dyn FilterParser>> {
        let name = self.filter_aliases.get(name).map(|n| n.as_str()).unwrap_or(name);
        self.filter_parsers.get(name).cloned()
    }

    pub fn query_parser_names(&self) -> impl Iterator<Item = &str> {
        self.query_parsers.keys().map(|k| k.as_str())
    }

    pub fn filter_parser_names(&self) -> impl Iterator<Item = &str> {
        self.filter_parsers.keys().map(|k| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::parser::{ParseError, ParsedQuery};
    use crate::state::Settings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes its body back and remembers which index it was built for.
    struct PluginParser {
        name: String,
        index: String,
    }

    impl PluginParser {
        fn echo(&self, body: &str) -> Result<ParsedQuery, ParseError> {
            Ok(ParsedQuery {
                parser: self.name.clone(),
                body: format!("{}:{}", self.index, body),
            })
        }
    }

    impl QueryParser for PluginParser {
        fn names(&self) -> Vec<String> {
            vec![self.name.clone()]
        }

        fn parse(&self, body: &str) -> Result<ParsedQuery, ParseError> {
            self.echo(body)
        }
    }

    impl FilterParser for PluginParser {
        fn names(&self) -> Vec<String> {
            vec![self.name.clone()]
        }

        fn parse(&self, body: &str) -> Result<ParsedQuery, ParseError> {
            self.echo(body)
        }
    }

    struct AliasedParser {
        inner: PluginParser,
        aliases: Vec<String>,
    }

    impl QueryParser for AliasedParser {
        fn names(&self) -> Vec<String> {
            self.aliases.clone()
        }

        fn parse(&self, body: &str) -> Result<ParsedQuery, ParseError> {
            self.inner.echo(body)
        }
    }

    fn plugin(context: &ParserContext) -> PluginParser {
        PluginParser {
            name: "my".to_string(),
            index: context.index.clone(),
        }
    }

    #[test]
    fn custom_parsers_resolve_by_name() {
        let mut module = ParserModule::new();
        module.add_query_parser("my", |ctx| Arc::new(plugin(ctx))).unwrap();
        module.add_filter_parser("my", |ctx| Arc::new(plugin(ctx))).unwrap();

        let service = module.build(&ParserContext::new("test", Settings::empty()));

        let query_parser = service.query_parser("my").expect("registered");
        assert_eq!(query_parser.names()[0], "my");
        assert_eq!(query_parser.parse("x").unwrap().body, "test:x");
        let filter_parser = service.filter_parser("my").expect("registered");
        assert_eq!(filter_parser.names()[0], "my");

        assert!(service.query_parser("match_all").is_some());
        assert!(service.query_parser("missing").is_none());
        assert_eq!(service.query_parser_names().collect::<Vec<_>>(), vec!["match_all", "my"]);
    }

    #[test]
    fn duplicate_names_are_rejected_per_kind() {
        let mut module = ParserModule::new();
        module.add_query_parser("my", |ctx| Arc::new(plugin(ctx))).unwrap();

        assert_eq!(
            module.add_query_parser("my", |ctx| Arc::new(plugin(ctx))),
            Err(RegistryError::DuplicateParser {
                kind: "query",
                name: "my".into()
            })
        );
        assert!(module.add_query_parser("match_all", |ctx| Arc::new(plugin(ctx))).is_err());
        assert_eq!(
            module.add_filter_parser("", |ctx| Arc::new(plugin(ctx))),
            Err(RegistryError::EmptyName)
        );
        // Same name is fine for the other kind.
        assert!(module.add_filter_parser("my", |ctx| Arc::new(plugin(ctx))).is_ok());
    }

    #[test]
    fn parsers_resolve_by_every_name_they_report() {
        let mut module = ParserModule::new();
        module
            .add_query_parser("my", |ctx| {
                Arc::new(AliasedParser {
                    inner: plugin(ctx),
                    aliases: vec!["my".into(), "myQuery".into(), "match_all".into()],
                })
            })
            .unwrap();

        let service = module.build(&ParserContext::new("test", Settings::empty()));

        let by_alias = service.query_parser("matchAll").expect("built-in alias");
        assert_eq!(by_alias.parse("").unwrap().parser, MATCH_ALL);
        assert!(service.filter_parser("matchAll").is_some());
        assert_eq!(service.query_parser("myQuery").unwrap().parse("x").unwrap().parser, "my");
        // A registration name is never shadowed by another parser's alias.
        assert_eq!(service.query_parser("match_all").unwrap().parse("").unwrap().parser, MATCH_ALL);
        assert_eq!(service.query_parser_names().collect::<Vec<_>>(), vec!["match_all", "my"]);
    }

    #[test]
    fn each_factory_runs_once_per_build() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut module = ParserModule::new();
        let counter = calls.clone();
        module
            .add_query_parser("counted", move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Arc::new(plugin(ctx))
            })
            .unwrap();

        let service = module.build(&ParserContext::new("test", Settings::empty()));
        service.query_parser("counted").unwrap();
        service.query_parser("counted").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        module.build(&ParserContext::new("other", Settings::empty()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
