fn main() {
    if let Err(err) = csv_weaver::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
