use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use qwentok::Tokenizer;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const DIR_ENV: &str = "QWENTOK_DIR";

struct Args {
    dir: Option<String>,
    decode: bool,
    count: bool,
    quiet: bool,
    help: bool,
    version: bool,
    texts: Vec<String>,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut args = Args {
        dir: None,
        decode: false,
        count: false,
        quiet: false,
        help: false,
        version: false,
        texts: Vec::new(),
    };

    let mut i = 0;
    while i < argv.len() {
        match argv[i].as_str() {
            "-V" | "--version" => args.version = true,
            "-h" | "--help" => args.help = true,
            "--decode" => args.decode = true,
            "-c" | "--count" => args.count = true,
            "-q" | "--quiet" => args.quiet = true,
            "-d" | "--dir" => {
                i += 1;
                if i >= argv.len() {
                    eprintln!("Error: --dir requires a value");
                    std::process::exit(1);
                }
                args.dir = Some(argv[i].clone());
            }
            "--" => {
                args.texts.extend(argv[i + 1..].iter().cloned());
                break;
            }
            s if s.starts_with('-') && s.len() > 1 => {
                eprintln!("Error: unknown option: {}", s);
                std::process::exit(1);
            }
            _ => args.texts.push(argv[i].clone()),
        }
        i += 1;
    }
    args
}

fn print_help() {
    println!(
        "Usage: qwentok [options] [text...]\n\
         \n\
         Encode text to token ids (or decode ids to text) with a byte-level\n\
         BPE tokenizer.\n\
         \n\
         Options:\n\
         \x20 -d, --dir <path>   Directory with vocab.json, merges.txt and\n\
         \x20                    tokenizer_config.json (default: ${} or .)\n\
         \x20 --decode           Read token ids and print the decoded text\n\
         \x20 -c, --count        Print only the number of tokens\n\
         \x20 -q, --quiet        Disable logging (otherwise RUST_LOG, default warn)\n\
         \x20 -V, --version      Show version\n\
         \x20 -h, --help         Show this help\n\
         \n\
         When no text is given, reads from stdin. Each text argument is\n\
         encoded separately and printed on its own line.",
        DIR_ENV
    );
}

fn init_logging(quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn model_dir(arg: Option<&str>) -> PathBuf {
    if let Some(dir) = arg {
        return PathBuf::from(dir);
    }
    std::env::var(DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn read_model_file(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path.display(), e);
        std::process::exit(1);
    })
}

fn load_tokenizer(dir: &Path) -> Tokenizer {
    let vocab = read_model_file(dir, "vocab.json");
    let merges = read_model_file(dir, "merges.txt");
    let config = read_model_file(dir, "tokenizer_config.json");
    match Tokenizer::new(&vocab, &merges, &config) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error loading tokenizer from {}: {}", dir.display(), e);
            std::process::exit(1);
        }
    }
}

fn parse_ids(text: &str) -> Vec<u32> {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == '[' || c == ']')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().unwrap_or_else(|_| {
                eprintln!("Error: not a token id: {}", s);
                std::process::exit(1);
            })
        })
        .collect()
}

fn format_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn main() {
    let args = parse_args();

    if args.version {
        println!("qwentok {}", VERSION);
        return;
    }
    if args.help {
        print_help();
        return;
    }

    init_logging(args.quiet);

    let inputs: Vec<String> = if args.texts.is_empty() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).unwrap_or_else(|e| {
            eprintln!("Error reading stdin: {}", e);
            std::process::exit(1);
        });
        vec![buf]
    } else {
        args.texts
    };

    let dir = model_dir(args.dir.as_deref());
    let tok = load_tokenizer(&dir);

    if args.decode {
        for input in &inputs {
            let ids = parse_ids(input);
            if args.count {
                println!("{}", ids.len());
            } else {
                println!("{}", tok.decode(&ids));
            }
        }
        return;
    }

    let texts: Vec<&str> = inputs.iter().map(String::as_str).collect();
    let results = if texts.len() > 1 {
        tok.encode_batch(&texts)
    } else {
        texts.iter().map(|t| tok.encode(t)).collect()
    };
    for ids in &results {
        if args.count {
            println!("{}", ids.len());
        } else {
            println!("{}", format_ids(ids));
        }
    }
}
