//! Command encoding and dispatch for the `/command/` endpoint (§6.1).
//!
//! The wire format is inherited as-is from the original implementation:
//! the query string's keys are stringified non-negative integers giving a
//! positional argument index (`?0=create&1=dir1&2=file.txt`), which the
//! server reconstructs into a dense array before dispatching on `args[0]`.
//! Decoding and dispatch are kept as two separate, independently testable
//! stages.

/// Reconstruct the dense positional argument array from a raw query
/// string. Non-numeric keys are ignored; numeric keys denote the index of
/// the corresponding value. A gap (e.g. keys `0` and `2` but no `1`) is
/// filled with an empty string, mirroring the original's list comprehension
/// over a dict that silently produces `0` placeholders for missing keys.
pub fn decode_positional_args(query: &str) -> Vec<String> {
    let mut indexed: Vec<(usize, String)> = form_urlencoded::parse(query.as_bytes())
        .filter_map(|(key, value)| key.parse::<usize>().ok().map(|index| (index, value.into_owned())))
        .collect();
    indexed.sort_by_key(|(index, _)| *index);

    let len = indexed.iter().map(|(index, _)| index + 1).max().unwrap_or(0);
    let mut args = vec![String::new(); len];
    for (index, value) in indexed {
        args[index] = value;
    }
    args
}

/// A parsed `/command/` invocation, tagged by operation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    Create { path: String, filename: String },
    Delete { path: String, filename: String },
    Info { path: String, filename: String },
    Copy { path: String, filename: String, new_path: String, new_filename: Option<String> },
    Move { path: String, filename: String, new_path: String, new_filename: Option<String> },
    ReadDir { path: String },
    MakeDir { path: String, dirname: String },
    DeleteDir { path: String, dirname: String },
    Read { path: String, filename: String },
    Write { path: String, filename: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing operation name")]
    MissingOperation,
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("operation {op} requires at least {expected} argument(s), got {actual}")]
    MissingArguments { op: String, expected: usize, actual: usize },
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Command, ParseError> {
        let op = args.first().ok_or(ParseError::MissingOperation)?;
        let rest = &args[1.min(args.len())..];

        let require = |expected: usize| -> Result<(), ParseError> {
            if rest.len() < expected {
                Err(ParseError::MissingArguments { op: op.clone(), expected, actual: rest.len() })
            } else {
                Ok(())
            }
        };

        match op.as_str() {
            "init" => Ok(Command::Init),
            "create" => {
                require(2)?;
                Ok(Command::Create { path: rest[0].clone(), filename: rest[1].clone() })
            }
            "delete" => {
                require(2)?;
                Ok(Command::Delete { path: rest[0].clone(), filename: rest[1].clone() })
            }
            "info" => {
                require(2)?;
                Ok(Command::Info { path: rest[0].clone(), filename: rest[1].clone() })
            }
            "copy" => {
                require(3)?;
                Ok(Command::Copy {
                    path: rest[0].clone(),
                    filename: rest[1].clone(),
                    new_path: rest[2].clone(),
                    new_filename: rest.get(3).cloned(),
                })
            }
            "move" => {
                require(3)?;
                Ok(Command::Move {
                    path: rest[0].clone(),
                    filename: rest[1].clone(),
                    new_path: rest[2].clone(),
                    new_filename: rest.get(3).cloned(),
                })
            }
            "readdir" => {
                require(1)?;
                Ok(Command::ReadDir { path: rest[0].clone() })
            }
            "makedir" => {
                require(2)?;
                Ok(Command::MakeDir { path: rest[0].clone(), dirname: rest[1].clone() })
            }
            "deletedir" => {
                require(2)?;
                Ok(Command::DeleteDir { path: rest[0].clone(), dirname: rest[1].clone() })
            }
            "read" => {
                require(2)?;
                Ok(Command::Read { path: rest[0].clone(), filename: rest[1].clone() })
            }
            "write" => {
                require(2)?;
                Ok(Command::Write { path: rest[0].clone(), filename: rest[1].clone() })
            }
            other => Err(ParseError::UnknownOperation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reconstructs_dense_array_in_order() {
        let args = decode_positional_args("0=create&1=dir1&2=file.txt");
        assert_eq!(args, vec!["create", "dir1", "file.txt"]);
    }

    #[test]
    fn decode_ignores_non_numeric_keys() {
        let args = decode_positional_args("0=readdir&1=dir1&noise=ignored");
        assert_eq!(args, vec!["readdir", "dir1"]);
    }

    #[test]
    fn decode_handles_out_of_order_keys() {
        let args = decode_positional_args("2=c&0=a&1=b");
        assert_eq!(args, vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_copy_defaults_new_filename_to_none() {
        let args = decode_positional_args("0=copy&1=p&2=f&3=newp");
        let command = Command::parse(&args).unwrap();
        assert_eq!(
            command,
            Command::Copy {
                path: "p".to_string(),
                filename: "f".to_string(),
                new_path: "newp".to_string(),
                new_filename: None,
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_operation() {
        let args = vec!["frobnicate".to_string()];
        assert_eq!(Command::parse(&args), Err(ParseError::UnknownOperation("frobnicate".to_string())));
    }

    #[test]
    fn parse_rejects_missing_arguments() {
        let args = vec!["create".to_string(), "onlypath".to_string()];
        assert_eq!(
            Command::parse(&args),
            Err(ParseError::MissingArguments { op: "create".to_string(), expected: 2, actual: 1 })
        );
    }
}
