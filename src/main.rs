use std::{env, fs::File, path::Path, process::ExitCode};

use jhead_class_file::{ClassFile, Result};

fn main() -> ExitCode {
    pretty_env_logger::init();

    let paths = env::args().skip(1).collect::<Vec<_>>();
    if paths.is_empty() {
        eprintln!("usage: jhead <file.class>...");
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for path in &paths {
        match print_header(Path::new(path)) {
            Ok(true) => {}
            Ok(false) => {
                eprintln!("{}: not a class file", path);
                failed = true;
            }
            Err(e) => {
                eprintln!("{}: {}", path, e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Prints the header of the class file at `path`, or returns `false` if it is not a class file.
fn print_header(path: &Path) -> Result<bool> {
    let class_file = ClassFile::parse(File::open(path)?)?;
    if !class_file.is_valid() {
        log::debug!("Bad magic identifier in {}", path.display());
        return Ok(false);
    }

    log::info!(
        "{}: version {}.{}, {} constants",
        path.display(),
        class_file.major_version,
        class_file.minor_version,
        class_file.constant_pool.len()
    );
    if let Some(source_file) = class_file.source_file()? {
        println!("// Compiled from {}", source_file);
    }
    println!("{}", class_file.header()?);
    Ok(true)
}
