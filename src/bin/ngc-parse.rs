// Copyright (c) 2019 Georg Brandl.  Licensed under the Apache License,
// Version 2.0 <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0>
// or the MIT license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at
// your option. This file may not be copied, modified, or distributed except
// according to those terms.

use std::{env, fs, process};
use ngc::parse::parse;

fn main() {
    let filename = match env::args().nth(1) {
        Some(f) => f,
        None => {
            eprintln!("usage: ngc-parse <file.ngc>");
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

    match parse(&filename, &input) {
        Err(e) => {
            eprintln!("Parse error: {}", e);
            process::exit(1);
        }
        Ok(prog) => print!("{}", prog),
    }
}
