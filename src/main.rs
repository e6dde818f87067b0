fn main() {
    if let Err(err) = tabtree::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
