use sqlinject::{detect_sqli, tokenize, SqliFlags};

fn main() -> Result<(), sqlinject::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("sqlinject {}", sqlinject::version());

    let cases = [
        ("SELECT * FROM users WHERE id = 1", "Normal SQL"),
        ("1' OR '1'='1", "Tautology"),
        ("' UNION SELECT * FROM passwords --", "UNION attack"),
        ("admin'--", "Comment truncation"),
        ("Hello world", "Regular text"),
    ];

    println!("\n=== SQL Injection Detection ===");
    for (input, description) in &cases {
        let result = detect_sqli(input.as_bytes())?;
        println!(
            "{description}: {input} -> {} (fingerprint: {}, flags: {:?})",
            result.is_injection(),
            result.fingerprint(),
            result.flags()
        );
    }

    println!("\n=== Tokens ===");
    for token in tokenize(b"1 UNION SELECT password FROM users", SqliFlags::SQL_ANSI) {
        println!("{token}");
    }
    Ok(())
}
