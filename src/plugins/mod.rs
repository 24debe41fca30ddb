mod parser;
mod registry;

pub use parser::FilterParser;
pub use parser::ParseError;
pub use parser::ParsedQuery;
pub use parser::ParserContext;
pub use parser::QueryParser;
pub use registry::FilterParserFactory;
pub use registry::IndexQueryParserService;
pub use registry::ParserModule;
pub use registry::QueryParserFactory;
pub use registry::RegistryError;
