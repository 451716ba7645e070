use callsite_redirect::jvm::class_file::ClassFile;
use callsite_redirect::*;

use clap::{App, Arg};
use rayon::prelude::*;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

fn main() -> Result<(), redirect::Error> {
    env_logger::init();

    let matches = App::new("JVM call site redirector")
        .version("0.1.0")
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Rewrites virtual calls in compiled classes to dispatch on the receiver type")
        .arg(
            Arg::with_name("registry")
                .long("registry")
                .value_name("FILE")
                .help("Registered types, redirects, and exclusions")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("exclude")
                .long("exclude")
                .value_name("CLASS")
                .help("Class to leave untouched")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("exclude prefix")
                .long("exclude-prefix")
                .value_name("PREFIX")
                .help("Leave classes with this name prefix untouched")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("output dir")
                .long("output-dir")
                .value_name("DIR")
                .help("Where to write rewritten classes")
                .takes_value(true)
                .default_value("."),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Class files to transform")
                .required(true)
                .multiple(true)
                .index(1),
        )
        .get_matches();

    let mut registry = redirect::Registry::new();
    let mut settings = redirect::Settings::new();

    let registry_file = matches.value_of("registry").unwrap();
    log::info!("Reading registrations from '{}'", registry_file);
    let registrations = fs::read_to_string(registry_file).map_err(jvm::Error::IoError)?;
    redirect::load_registrations(&registrations, &mut registry, &mut settings)?;
    for owner in registry.replacement_owners() {
        log::debug!("Leaving replacement class '{}' untouched", owner);
    }

    for class in matches.values_of("exclude").into_iter().flatten() {
        settings.exclude_class(class)?;
    }
    for prefix in matches.values_of("exclude prefix").into_iter().flatten() {
        settings.exclude_prefix(prefix);
    }

    let output_dir = Path::new(matches.value_of("output dir").unwrap());
    let inputs: Vec<&str> = matches.values_of("INPUT").into_iter().flatten().collect();

    let transformer = redirect::ClassTransformer::new(&registry, settings);
    inputs
        .par_iter()
        .try_for_each(|input| transform_file(&transformer, input, output_dir))
}

/// Transform one class file and write the result (rewritten or not) under the output directory
fn transform_file(
    transformer: &redirect::ClassTransformer<'_>,
    input: &str,
    output_dir: &Path,
) -> Result<(), redirect::Error> {
    let bytes = fs::read(input).map_err(jvm::Error::IoError)?;
    let class_name = ClassFile::parse_bytes(&bytes)?.class_name()?.to_owned();

    let output = transformer.transform(&class_name, &bytes)?;
    let output_file = output_dir.join(format!("{}.class", class_name));
    match output {
        Cow::Owned(_) => log::info!("Writing rewritten '{}'", output_file.display()),
        Cow::Borrowed(_) => log::info!("Writing unchanged '{}'", output_file.display()),
    }

    if let Some(parent) = output_file.parent() {
        fs::create_dir_all(parent).map_err(jvm::Error::IoError)?;
    }
    fs::write(&output_file, &output).map_err(jvm::Error::IoError)?;
    Ok(())
}
