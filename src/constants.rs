/// Log directive for the application
pub const LOG_DIRECTIVE: &str = "birthday_mailer=info";

/// Default SMTP submission host (implicit TLS)
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default SMTP submission port (implicit TLS)
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Domain used for generated inline image content-ids
pub const CONTENT_ID_DOMAIN: &str = "birthday.local";

/// Separator used when listing several birthday people in one message
pub const NAME_SEPARATOR: &str = ", ";
