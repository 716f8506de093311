#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

mod app;

use clap::load_yaml;
use clap::App;
use std::io;
use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::init();

    let yaml = load_yaml!("cli.yml");
    let app_m = App::from_yaml(yaml).get_matches();

    match app_m.subcommand() {
        ("parse", Some(sub_m)) => {
            let data_source = match sub_m.value_of("file") {
                Some(path) => app::DataSource::File(PathBuf::from(path)),
                None => app::DataSource::Stdin,
            };

            let result = app::Options::new(
                sub_m.value_of("schema").unwrap_or("auto"),
                sub_m.value_of("output").unwrap_or("table"),
                sub_m.value_of("fields"),
                sub_m.is_present("skip_invalid"),
                sub_m.is_present("parallel"),
            )
            .and_then(|options| {
                let stdout = io::stdout();
                let mut out = stdout.lock();
                app::run(data_source, &options, &mut out)
            });

            if let Err(e) = result {
                eprintln!("{}", e);
                process::exit(1);
            }
        }
        _ => {
            println!("{}", app_m.usage());
        }
    }
}
