// Utilities module
//
// - validation: hostname and port checks shared by the resolver and the certificate registry

pub mod validation;
