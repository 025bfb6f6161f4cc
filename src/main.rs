//! airbin-gen: translate a device configuration into an AIRBIN image

use std::env;
use std::fs::File;
use std::io::BufWriter;
use std::process;

use airbin_gen::ir::Device;
use airbin_gen::translate;

fn usage() {
    eprintln!("usage: airbin-gen <device.json> [-o OUTPUT]");
    eprintln!();
    eprintln!("Translates a JSON device description into an AIRBIN ELF.");
    eprintln!("The output defaults to airbin.elf in the current directory.");
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input = None;
    let mut output = String::from("airbin.elf");

    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                usage();
                return Ok(());
            }
            "-o" | "--output" => match iter.next() {
                Some(path) => output = path.clone(),
                None => {
                    eprintln!("{arg} needs a path");
                    process::exit(2);
                }
            },
            _ if !arg.starts_with('-') => input = Some(arg.clone()),
            _ => {
                eprintln!("unknown option {arg}");
                usage();
                process::exit(2);
            }
        }
    }

    let Some(input) = input else {
        usage();
        process::exit(2);
    };

    let device = Device::from_json_file(&input)?;
    log::info!("loaded {}: {} tiles", input, device.tiles.len());

    let file = File::create(&output)?;
    let mut writer = BufWriter::new(file);
    translate::translate(&device, &mut writer)?;

    println!("wrote {output}");
    Ok(())
}
