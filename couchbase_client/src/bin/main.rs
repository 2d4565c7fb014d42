use couchbase_client::Cluster;

/// Tiny smoke tool: set then get one key.
///
/// Usage: client <address> <bucket> <username> <password> <key> [value]
fn main() {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [address, bucket_name, username, password, key, rest @ ..] = &args[..] else {
        eprintln!("usage: client <address> <bucket> <username> <password> <key> [value]");
        std::process::exit(2);
    };

    let cluster = Cluster::connect([address.clone()], username, password);
    let bucket = match cluster.bucket(bucket_name) {
        Ok(bucket) => bucket,
        Err(e) => {
            eprintln!("failed to open bucket: {e}");
            std::process::exit(1);
        }
    };

    if let Some(value) = rest.first() {
        match bucket.set(key.clone(), 0, 0, value.clone()) {
            Ok(cas) => println!("stored {key} (cas {cas})"),
            Err(e) => {
                eprintln!("set failed: {e}");
                std::process::exit(1);
            }
        }
    }

    match bucket.get(key.clone()) {
        Ok(doc) => println!("{}", String::from_utf8_lossy(&doc.value)),
        Err(e) => {
            eprintln!("get failed: {e}");
            std::process::exit(1);
        }
    }
}
