fn main() {
    // Fatal errors are logged where they happen.
    if socrata_loader::run().is_err() {
        std::process::exit(1);
    }
}
