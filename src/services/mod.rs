/// Business logic for the daily birthday runs
mod notifier;
mod report;
mod template_renderer;

pub use notifier::{BirthdayNotifier, NotifierError, NotifierSettings};
pub use report::DispatchReport;
pub use template_renderer::TemplateRenderer;
