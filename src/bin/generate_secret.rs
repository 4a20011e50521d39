//! Prints a fresh random secret suitable for `APP_AUTH__SECRET`.

fn main() {
    match chirpy::auth::generate_opaque_secret() {
        Ok(secret) => println!("{}", secret),
        Err(e) => {
            eprintln!("Failed to generate secret: {}", e);
            std::process::exit(1);
        }
    }
}
