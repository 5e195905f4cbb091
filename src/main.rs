#![cfg(not(tarpaulin_include))]

use datatable::debounce::{Clock, MonotonicClock};
use datatable::export::{DirectorySink, MemorySink, TextSink};
use datatable::predicate::{FilterCondition, FilterOperator};
use datatable::record::Schema;
use datatable::source::{RecordSource, source_for_path};
use datatable::storage::{FileStorage, MemoryStorage, Storage, is_logged_in, set_logged_in};
use datatable::table::{DataTable, ReloadOutcome};
use datatable::TableConfig;
use lazy_static::lazy_static;
use regex::Regex;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

lazy_static! {
    // Column names may contain spaces ("Spam Score"), so the column is the
    // shortest prefix followed by a recognised operator.
    static ref WHERE_REGEX: Regex = Regex::new(
        r"(?i)^where\s+(.+?)\s+(contains|equals|greater|less|eq|gt|lt|==|=|>|<|~)\s+(.*)$"
    ).unwrap();
}

const CELL_WIDTH: usize = 14;

struct Args {
    config: Option<PathBuf>,
    store: Option<PathBuf>,
    source: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        config: None,
        store: None,
        source: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "--store" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| format!("{} needs a file argument", args[i]))?;
                if args[i] == "--config" {
                    parsed.config = Some(PathBuf::from(value));
                } else {
                    parsed.store = Some(PathBuf::from(value));
                }
                i += 2;
            }
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            path => {
                parsed.source = Some(PathBuf::from(path));
                i += 1;
            }
        }
    }

    Ok(parsed)
}

fn truncate(value: &str) -> String {
    if value.chars().count() <= CELL_WIDTH {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(CELL_WIDTH - 1).collect();
        cut.push('~');
        cut
    }
}

fn display<S: Storage>(table: &DataTable<S>) {
    print!("     {:<3}", "");
    for name in table.schema().names() {
        print!("{:<width$} ", truncate(name), width = CELL_WIDTH);
    }
    println!();

    let window = table.window();
    for row in table.visible_rows() {
        let mark = if row.selected { "[x]" } else { "[ ]" };
        print!("{:>4} {}", row.item.index, mark);
        for value in row.record.values() {
            print!("{:<width$} ", truncate(value), width = CELL_WIDTH);
        }
        println!();
    }

    println!(
        "rows {}-{} of {} ({} loaded), sort {} {:?}, {} selected",
        window.range.start,
        window.range.end,
        table.len(),
        table.records().len(),
        table.sort_state().column,
        table.sort_state().direction,
        table.selected_positions().len(),
    );
}

fn print_help() {
    println!("Commands:");
    println!("  filter <text>                   Search all columns (debounced)");
    println!("  where <column> <op> <value>     Set a column condition (contains, equals, greater, less)");
    println!("  unwhere <column>                Remove a column condition");
    println!("  clearwhere                      Remove all column conditions");
    println!("  sort <column>                   Sort by column, again to flip direction");
    println!("  scroll <px>                     Scroll the viewport");
    println!("  top                             Scroll to the first row");
    println!("  select <n>                      Toggle selection of row n");
    println!("  selectall                       Toggle selection of all rows");
    println!("  unselect                        Clear the selection");
    println!("  copy [n]                        Copy the selection (or row n) as CSV");
    println!("  export [dir]                    Write the selection to selected_data.csv");
    println!("  reload [force]                  Reload the data, bypassing the cache with force");
    println!("  logout                          Forget the session, filters and cached data");
    println!("  q                               Quit");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: datatable [--config FILE] [--store FILE] [CSV|JSON]");
            return Ok(());
        }
    };

    let mut config = TableConfig::load(args.config.as_deref())?;
    if args.store.is_some() {
        config.storage_path = args.store;
    }
    let source_path = args
        .source
        .or_else(|| config.source.clone())
        .unwrap_or_else(|| PathBuf::from("public/data.csv"));
    let source: Box<dyn RecordSource> = source_for_path(&source_path)?;

    let storage: Box<dyn Storage> = match &config.storage_path {
        Some(path) => Box::new(FileStorage::open(path)),
        None => Box::new(MemoryStorage::new()),
    };

    let clock = MonotonicClock::new();
    let mut table = DataTable::new(Schema::listings(), &config, storage);

    if !is_logged_in(table.storage()) {
        println!("Welcome! Starting a new session.");
        set_logged_in(table.storage_mut(), true)?;
    }

    let mut status = match table.reload(source.as_ref(), false) {
        ReloadOutcome::Applied(n) => format!("loaded {}", n),
        _ => table.take_notice().unwrap_or_else(|| "load failed".to_string()),
    };

    let mut start_time = Instant::now();
    loop {
        // Typed text is committed once the prompt has been idle long enough;
        // the REPL blocks on input, so the wait happens here.
        if let Some(deadline) = table.filter_deadline() {
            std::thread::sleep(deadline.saturating_sub(clock.now()));
            table.tick(clock.now());
        }

        display(&table);

        let elapsed_time = start_time.elapsed().as_secs_f64();
        print!("[{:.1}] ({}) > ", elapsed_time, status);
        io::stdout().flush()?;

        let mut command = String::new();
        if io::stdin().read_line(&mut command)? == 0 {
            break;
        }
        let command = command.trim();
        start_time = Instant::now();

        if command.is_empty() {
            status = String::from("ok");
            continue;
        }

        let (verb, rest) = match command.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (command, ""),
        };

        status = match verb {
            "q" => break,
            "help" => {
                print_help();
                String::from("ok")
            }
            "filter" => {
                table.type_filter_text(rest, clock.now());
                String::from("ok")
            }
            "where" => match WHERE_REGEX.captures(command) {
                Some(caps) => {
                    let operator = caps[2].parse::<FilterOperator>();
                    match operator {
                        Ok(operator) => {
                            let condition = FilterCondition::new(&caps[1], operator, &caps[3]);
                            match table.set_condition(condition) {
                                Ok(()) => String::from("ok"),
                                Err(e) => e.to_string(),
                            }
                        }
                        Err(e) => e,
                    }
                }
                None => String::from("usage: where <column> <op> <value>"),
            },
            "unwhere" => match table.remove_condition(rest) {
                Ok(true) => String::from("ok"),
                Ok(false) => String::from("no condition"),
                Err(e) => e.to_string(),
            },
            "clearwhere" => {
                table.clear_conditions();
                String::from("ok")
            }
            "sort" => match table.toggle_sort(rest) {
                Ok(()) => String::from("ok"),
                Err(e) => e.to_string(),
            },
            "scroll" => match rest.parse::<f64>() {
                Ok(px) => {
                    table.scroll_to(px);
                    String::from("ok")
                }
                Err(_) => String::from("invalid offset"),
            },
            "top" => {
                table.scroll_to(0.0);
                String::from("ok")
            }
            "select" => match rest.parse::<usize>() {
                Ok(position) => match table.toggle_selection(position) {
                    Ok(true) => String::from("selected"),
                    Ok(false) => String::from("unselected"),
                    Err(e) => e.to_string(),
                },
                Err(_) => String::from("invalid row"),
            },
            "selectall" => {
                table.toggle_select_all();
                String::from("ok")
            }
            "unselect" => {
                table.clear_selection();
                String::from("ok")
            }
            "copy" => {
                let mut clipboard = MemorySink::default();
                let copied = if rest.is_empty() {
                    table.copy_selected(&mut clipboard)
                } else {
                    match rest.parse::<usize>() {
                        Ok(position) => table.copy_row(position, &mut clipboard),
                        Err(_) => false,
                    }
                };
                match clipboard.last.filter(|_| copied) {
                    Some(text) => {
                        print!("{}", text);
                        String::from("copied")
                    }
                    None => String::from("copy failed"),
                }
            }
            "export" => {
                let dir = if rest.is_empty() { "." } else { rest };
                let mut sink = DirectorySink::new(dir);
                match table.export_selected() {
                    Ok(text) => match sink.write_text(&text) {
                        Ok(()) => format!("wrote {}", sink.target().display()),
                        Err(e) => e.to_string(),
                    },
                    Err(e) => e.to_string(),
                }
            }
            "reload" => match table.reload(source.as_ref(), rest == "force") {
                ReloadOutcome::Applied(n) => format!("loaded {}", n),
                ReloadOutcome::Stale => String::from("stale"),
                ReloadOutcome::Failed => table
                    .take_notice()
                    .unwrap_or_else(|| String::from("load failed")),
            },
            "logout" => {
                table.reset_preferences(Some(source.as_ref()));
                if let Err(e) = set_logged_in(table.storage_mut(), false) {
                    log::warn!("failed to clear login flag: {}", e);
                }
                println!("Logged out.");
                break;
            }
            _ => String::from("invalid command"),
        };
    }

    Ok(())
}
