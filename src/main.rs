//! tvlq - query CLI

use clap::{Args, Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::process;
use tracing_subscriber::EnvFilter;
use tvl_query::cli::{DemoGenerator, OutputFormat, OutputFormatter, ReplHelper};
use tvl_query::statement::Span;
use tvl_query::{
    EngineConfig, ExecutionContext, MemoryStore, Outcome, QueryError, QueryResult, StatementKind,
    Value,
};

#[derive(Parser)]
#[command(name = "tvlq")]
#[command(about = "SQL query engine with three-valued logic and merge-join pruning")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run SQL statements (separated by `;`)
    Sql {
        /// SQL text
        query: String,

        #[command(flatten)]
        options: Options,
    },

    /// Start an interactive shell
    Repl {
        #[command(flatten)]
        options: Options,
    },
}

#[derive(Args)]
struct Options {
    /// Load the orders/customers sample tables
    #[arg(long)]
    demo: bool,

    /// Extra generated customers for --demo
    #[arg(long, default_value = "0")]
    scale: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Allow SELECTs over tables that share no join condition
    #[arg(long)]
    allow_cartesian: bool,

    /// Do not pass key ranges of placed tables on as fetch hints
    #[arg(long)]
    no_hints: bool,

    /// Evaluate the WHERE clause only on complete candidate tuples
    #[arg(long)]
    no_incremental_pruning: bool,

    /// Print timing after each statement
    #[arg(long)]
    timing: bool,
}

impl Options {
    fn config(&self) -> EngineConfig {
        EngineConfig::new()
            .with_allow_cartesian(self.allow_cartesian)
            .with_propagate_hints(!self.no_hints)
            .with_incremental_pruning(!self.no_incremental_pruning)
    }

    fn formatter(&self) -> OutputFormatter {
        OutputFormatter::new(self.format)
    }

    fn context(&self) -> ExecutionContext<MemoryStore> {
        let mut store = MemoryStore::new();
        if self.demo {
            if let Err(e) = DemoGenerator::new(self.scale).generate(&mut store) {
                eprintln!("Error loading demo data: {}", e);
                process::exit(1);
            }
        }
        ExecutionContext::with_config(store, self.config())
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sql { query, options } => {
            let formatter = options.formatter();
            let mut ctx = options.context();
            match ctx.sql_script(&query) {
                Ok(results) => {
                    for result in &results {
                        print_result(result, &formatter, options.timing);
                    }
                }
                Err(e) => {
                    print_error(&query, &e);
                    process::exit(1);
                }
            }
        }
        Commands::Repl { options } => {
            let formatter = options.formatter();
            let ctx = options.context();
            if let Err(e) = Repl::new(ctx, formatter, options.timing).run() {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }
}

fn print_result(result: &QueryResult<Value>, formatter: &OutputFormatter, timing: bool) {
    for hint in result.diagnostics.iter() {
        eprintln!("{}", hint);
    }
    match &result.outcome {
        Outcome::Rows(rows) => {
            if let Err(e) = formatter.print(rows) {
                eprintln!("Error writing output: {}", e);
            }
            println!("{} row(s)", rows.len());
        }
        Outcome::Affected(n) => println!("{} row(s) affected", n),
        Outcome::Transaction(event) => println!("{:?}", event),
    }
    if timing {
        println!("Timing: {}", result.metrics);
    }
}

/// Print an error, pointing at the offending fragment for check failures
fn print_error(source: &str, error: &QueryError) {
    let QueryError::Check(diagnostics) = error else {
        eprintln!("Error: {}", error);
        return;
    };
    for diagnostic in diagnostics.iter() {
        eprintln!("{}", diagnostic);
        if let Some(span) = diagnostic.span {
            print_caret(source, span);
        }
    }
}

fn print_caret(source: &str, span: Span) {
    let Some(line) = source.lines().nth(span.line - 1) else {
        return;
    };
    eprintln!("  {}", line);
    let width = source
        .get(span.offset..span.offset + span.len)
        .map_or(1, |fragment| fragment.chars().count().max(1));
    eprintln!("  {}{}", " ".repeat(span.column - 1), "^".repeat(width));
}

const HELP: &str = "\
Statements end with ';'. Supported: SELECT, INSERT, UPDATE, DELETE,
BEGIN, COMMIT, ROLLBACK, SHOW TABLES, DESCRIBE <table>.

.help                  Show this help
.tables                List tables
.schema <table>        Show the columns of a table
.mode <format>         Output format: table, csv, json
.plan <select>         Show the join order chosen for a SELECT
.cartesian on|off      Allow SELECTs without join conditions
.timing                Toggle timing output
.quit                  Exit";

struct Repl {
    ctx: ExecutionContext<MemoryStore>,
    formatter: OutputFormatter,
    timing: bool,
    helper: ReplHelper,
}

impl Repl {
    fn new(ctx: ExecutionContext<MemoryStore>, formatter: OutputFormatter, timing: bool) -> Self {
        let helper = ReplHelper::new();
        helper.refresh(ctx.store());
        Self {
            ctx,
            formatter,
            timing,
            helper,
        }
    }

    fn run(mut self) -> rustyline::Result<()> {
        let mut editor: Editor<ReplHelper, DefaultHistory> = Editor::new()?;
        editor.set_helper(Some(self.helper.clone()));

        println!("tvlq {} - type .help for help", env!("CARGO_PKG_VERSION"));
        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() { "tvlq> " } else { "  ...> " };
            match editor.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if buffer.is_empty() && trimmed.starts_with('.') {
                        let _ = editor.add_history_entry(trimmed);
                        if !self.command(trimmed) {
                            break;
                        }
                        continue;
                    }
                    if trimmed.is_empty() {
                        continue;
                    }
                    if !buffer.is_empty() {
                        buffer.push('\n');
                    }
                    buffer.push_str(&line);
                    if trimmed.ends_with(';') {
                        let _ = editor.add_history_entry(buffer.as_str());
                        let sql = std::mem::take(&mut buffer);
                        self.execute(&sql);
                    }
                }
                Err(ReadlineError::Interrupted) => buffer.clear(),
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn execute(&mut self, sql: &str) {
        match self.ctx.sql_script(sql) {
            Ok(results) => {
                for result in &results {
                    print_result(result, &self.formatter, self.timing);
                }
            }
            Err(e) => print_error(sql, &e),
        }
        self.helper.refresh(self.ctx.store());
    }

    /// Run a dot command; false means exit
    fn command(&mut self, line: &str) -> bool {
        let (name, arg) = match line.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (line, ""),
        };
        match name {
            ".quit" | ".exit" => return false,
            ".help" => println!("{}", HELP),
            ".tables" => {
                for name in self.ctx.table_names() {
                    println!("{}", name);
                }
            }
            ".schema" => match self.ctx.table_metadata(arg) {
                Some(metadata) => {
                    for column in &metadata.columns {
                        let unique = if column.unique { " UNIQUE" } else { "" };
                        println!("  {} {}{}", column.name, column.data_type, unique);
                    }
                }
                None => eprintln!("Unknown table '{}'", arg),
            },
            ".mode" => match OutputFormat::parse(arg) {
                Some(format) => self.formatter.set_format(format),
                None => eprintln!(
                    "Current format: {}. Valid formats: {}",
                    self.formatter.format(),
                    OutputFormat::choices()
                ),
            },
            ".plan" => self.plan(arg.trim_end_matches(';')),
            ".cartesian" => {
                let allow = matches!(arg, "on" | "true" | "1");
                let config = self.ctx.config().with_allow_cartesian(allow);
                self.ctx.set_config(config);
                println!("Cartesian products {}", if allow { "allowed" } else { "refused" });
            }
            ".timing" => {
                self.timing = !self.timing;
                println!("Timing {}", if self.timing { "on" } else { "off" });
            }
            other => eprintln!("Unknown command '{}'. Type .help for help", other),
        }
        true
    }

    fn plan(&self, sql: &str) {
        let statement = match self.ctx.prepare(sql) {
            Ok(statement) => statement,
            Err(e) => return print_error(sql, &e),
        };
        let StatementKind::Select(select) = statement.kind() else {
            eprintln!(".plan needs a SELECT");
            return;
        };
        let diagnostics = self.ctx.check(&statement);
        for diagnostic in diagnostics.iter() {
            eprintln!("{}", diagnostic);
        }
        let plan = self.ctx.engine().plan(&select.tables);
        for id in &plan.selection_order {
            let table = select.tables.get(*id);
            let estimate = plan.estimates[id.index()];
            let estimate = if estimate == usize::MAX {
                "unknown".to_string()
            } else {
                estimate.to_string()
            };
            println!("{} {} (estimate {})", id, table.label(), estimate);
        }
        println!("Fetch order: {}", plan);
    }
}
