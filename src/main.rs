fn main() {
    if let Err(err) = record_lens::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
