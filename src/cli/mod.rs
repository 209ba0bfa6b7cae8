// CLI module
//
// - arguments: command line parsing and conversion into ProxySettings

pub mod arguments;

pub use arguments::HostpxArguments;
