#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::{check_deduct_storage, Cli, Commands};

    #[test]
    fn deduct_rejects_in_memory_storage() {
        assert!(check_deduct_storage("memory").is_err());
        assert!(check_deduct_storage("sqlite:stock.db").is_ok());
    }

    #[test]
    fn deduct_defaults_to_memory_storage_which_is_rejected() {
        let cli = Cli::try_parse_from(["stocklock", "deduct", "--id", "1"]).unwrap();
        match cli.command {
            Commands::Deduct { id, quantity, backends } => {
                assert_eq!(id, 1);
                assert_eq!(quantity, 1);
                assert!(check_deduct_storage(&backends.storage).is_err());
            }
            _ => panic!("Expected deduct"),
        }
    }

    #[test]
    fn deduct_accepts_sqlite_storage() {
        let cli = Cli::try_parse_from([
            "stocklock", "deduct", "--id", "3", "--quantity", "2", "--storage", "sqlite:stock.db",
        ])
        .unwrap();
        match cli.command {
            Commands::Deduct { backends, .. } => {
                assert!(check_deduct_storage(&backends.storage).is_ok());
            }
            _ => panic!("Expected deduct"),
        }
    }
}
