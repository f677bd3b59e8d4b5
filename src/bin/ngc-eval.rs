// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::{env, fs, process};
use tracing_subscriber::EnvFilter;
use ngc::eval::{Config, Undefined};

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut config = Config::default();
    let mut filename = None;
    for arg in env::args().skip(1) {
        match &*arg {
            "--strict" => config.undefined = Undefined::Error,
            _ => filename = Some(arg),
        }
    }
    let filename = match filename {
        Some(f) => f,
        None => {
            eprintln!("usage: ngc-eval [--strict] <file.ngc>");
            process::exit(2);
        }
    };
    let input = match fs::read_to_string(&filename) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Could not read {}: {}", filename, e);
            process::exit(1);
        }
    };

    match ngc::run(&filename, &input, config) {
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
        Ok(evaluator) => {
            for group in evaluator.command_list() {
                println!("{:4}: {}", group.lineno, group);
            }
            print!("{}", evaluator.dump_variables());
        }
    }
}
