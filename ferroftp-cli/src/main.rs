//! # ferroftp client
//!
//! This is a client you can install via `cargo install ferroftp-cli` on your system to connect and work with FTP servers
//!

#[macro_use]
extern crate log;

// -- mods
mod actions;
mod args;
mod command;

use std::io::Write;
use std::str::FromStr;

use actions::{perform, State};
use args::Args;
use command::Command;
use env_logger::Builder as LogBuilder;
use log::LevelFilter;
use tokio::io::{AsyncBufReadExt, BufReader};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

fn usage() {
    println!("Available commands:");
    println!("ABORT                               Abort the running transfer");
    println!("AUTH                                Secure the connection with AUTH TLS");
    println!("CIPHERS                             List the TLS cipher suites offered");
    println!("CONNECT <addr:port>                 Connect to remote host and login");
    println!("CONNECT+S <addr:port>               Connect to remote host using FTPS and login");
    println!("CWD <dir>                           Change working directory");
    println!("GET <file> <dest>                   Download `file` to `dest` in background");
    println!("HELP                                Print this help");
    println!("LIST [dir]                          List files. If directory is not provided, current directory is used");
    println!("MDTM <file>                         Get modification time for `file`");
    println!("MKDIR <dir>                         Create directory");
    println!("MODE <PASSIVE|ACTIVE>               Set default mode");
    println!("NOOP                                Ping server");
    println!("PUT <file> <dest>                   Upload local file `file` to `dest` in background");
    println!("PWD                                 Print working directory");
    println!("QUIT                                Quit ferroftp");
    println!("RENAME <source> <dest>              Rename file `source` to `dest`");
    println!("RM <file>                           Remove file");
    println!("RMDIR <dir>                         Remove directory");
    println!("SIZE <file>                         Get `file` size");
}

fn prompt() {
    print!(">> ");
    let _ = std::io::stdout().flush();
}

async fn run(state: &mut State, command: Command) {
    let name = command.name();
    match perform(state, command).await {
        Ok(outcome) => println!("{outcome}"),
        Err(err) => eprintln!("{name} error: {err}"),
    }
}

#[tokio::main]
async fn main() {
    let args: Args = argh::from_env();
    // print version
    if args.version {
        println!("ferroftp {APP_VERSION} - developed by {APP_AUTHORS}")
    }
    // init logger
    LogBuilder::new()
        .filter_level(if args.debug {
            LevelFilter::Trace
        } else if args.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Off
        })
        .init();
    // Main loop
    let mut state = State::default();

    // connect if host is specified
    if let Some(host) = args.host {
        run(&mut state, Command::Connect(host, false)).await;
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let line = match input.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => String::from("QUIT"),
            Err(err) => {
                eprintln!("Failed to read stdin: {err}");
                String::from("QUIT")
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match Command::from_str(line.as_str()) {
            Ok(Command::Quit) => {
                // Break if quit
                run(&mut state, Command::Quit).await;
                break;
            }
            Ok(Command::Help) => usage(),
            Ok(command) => run(&mut state, command).await,
            Err(err) => eprintln!("{err}"),
        }
    }
}
