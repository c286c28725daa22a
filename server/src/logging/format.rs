use colored::Color;
use std::fmt;
use std::fmt::Write;
use std::fmt::{Debug, Display};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

const REQUEST_ID_FIELD: &str = "request_id=";

/// `[time level] target@request_id{span fields}: message` on stdio,
/// `date time target@request_id{span fields} [L] message` in files.
pub(super) struct Formatter {
    use_colors: bool,
}

impl Formatter {
    pub(super) fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }
}

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let now = chrono::Local::now();
        let mut visitor = StringVisitor::new();
        event.record(&mut visitor);
        let mut fields_str = String::new();
        let mut request_id = String::new();
        for span in ctx
            .event_scope()
            .into_iter()
            .flat_map(tracing_subscriber::registry::Scope::from_root)
        {
            let exts = span.extensions();
            let fields = match exts.get::<FormattedFields<N>>() {
                Some(fields) if !fields.is_empty() => fields,
                _ => continue,
            };
            if let Some(id) = fields.strip_prefix(REQUEST_ID_FIELD) {
                request_id.push('@');
                request_id.push_str(id);
                continue;
            }
            fields_str.push(if fields_str.is_empty() { '{' } else { ' ' });
            fields_str.push_str(fields);
        }
        if !fields_str.is_empty() {
            fields_str.push('}');
        }

        if self.use_colors {
            write!(
                writer,
                "[{} {}] {} {}",
                ColoredText::bright_black(now.format("%X%.3f")),
                LogLevelFormat::colored(meta.level()),
                ColoredText::bright_black(format!(
                    "{}{}{}:",
                    meta.target(),
                    request_id,
                    fields_str
                )),
                visitor
            )?;
        } else {
            write!(
                writer,
                "{} {}{}{} {} {}",
                now.format("%F %X%.3f"),
                meta.target(),
                request_id,
                fields_str,
                LogLevelFormat::plain(meta.level()),
                visitor
            )?;
        }
        writeln!(writer)
    }
}

/// Collects the message first, then the remaining fields as `key=value`
struct StringVisitor {
    message: String,
    fields: String,
}

impl StringVisitor {
    fn new() -> Self {
        Self {
            message: String::new(),
            fields: String::new(),
        }
    }
}

impl Visit for StringVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            write!(self.message, "{:?}", value).ok();
        } else {
            write!(self.fields, " {}={:?}", field.name(), value).ok();
        }
    }
}

impl Display for StringVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        f.write_str(&self.fields)
    }
}

struct LogLevelFormat {
    label: &'static str,
    color: Option<Color>,
}

impl LogLevelFormat {
    fn colored(level: &Level) -> Self {
        let (label, color) = match *level {
            Level::ERROR => ("ERR", Color::BrightRed),
            Level::WARN => ("WRN", Color::BrightYellow),
            Level::INFO => ("INF", Color::BrightBlue),
            Level::DEBUG => ("DBG", Color::BrightMagenta),
            Level::TRACE => ("TRC", Color::BrightWhite),
        };
        Self {
            label,
            color: Some(color),
        }
    }
    fn plain(level: &Level) -> Self {
        let label = match *level {
            Level::ERROR => "[E]",
            Level::WARN => "[W]",
            Level::INFO => "[I]",
            Level::DEBUG => "[D]",
            Level::TRACE => "[T]",
        };
        Self { label, color: None }
    }
}

impl Display for LogLevelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.color {
            Some(color) => write!(f, "\x1B[{}m{}\x1B[0m", color.to_fg_str(), self.label),
            None => f.write_str(self.label),
        }
    }
}

struct ColoredText<T> {
    content: T,
    color: Color,
}

impl<T> ColoredText<T> {
    fn bright_black(value: T) -> ColoredText<T> {
        ColoredText {
            content: value,
            color: Color::BrightBlack,
        }
    }
}

impl<T: Display> Display for ColoredText<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\x1B[{}m{}\x1B[0m", self.color.to_fg_str(), self.content)
    }
}
