//! Puzzle file parsing and puzzle-folder scanning.
//!
//! Text format (whitespace/line-delimited integers):
//! - magic number identifying valid puzzle files
//! - piece count N
//! - repeat per piece:
//!   - voxel count
//!   - repeat per voxel: x z
//!
//! No offsets are stored; pieces are authored in their final assembled
//! coordinates and every placement starts at offset zero.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::warn;
use thiserror::Error;

use crate::pieces::Piece;

/// First token of every valid puzzle file.
pub const PUZZLE_MAGIC: i64 = 271828;

#[derive(Debug, Error)]
pub enum PuzzleFileError {
    #[error("failed to read puzzle file: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a puzzle file (leading magic {found}, expected {PUZZLE_MAGIC})")]
    BadMagic { found: i64 },
    #[error("malformed integer in puzzle file: {0}")]
    BadInt(#[from] std::num::ParseIntError),
    #[error("puzzle file ended early")]
    Truncated,
    #[error("puzzle file declares no pieces")]
    NoPieces,
    #[error("piece {index} declares no voxels")]
    EmptyPiece { index: usize },
}

/// Parses a puzzle source into its piece shapes, in file order.
pub fn parse_puzzle(source: &str) -> Result<Vec<Rc<Piece>>, PuzzleFileError> {
    let mut tokens = source.split_whitespace();
    let mut next_int = move || -> Result<i64, PuzzleFileError> {
        tokens
            .next()
            .ok_or(PuzzleFileError::Truncated)?
            .parse::<i64>()
            .map_err(PuzzleFileError::from)
    };

    let magic = next_int()?;
    if magic != PUZZLE_MAGIC {
        return Err(PuzzleFileError::BadMagic { found: magic });
    }

    let piece_count = next_int()?;
    if piece_count <= 0 {
        return Err(PuzzleFileError::NoPieces);
    }

    let mut pieces = Vec::with_capacity(piece_count as usize);
    for index in 0..piece_count {
        let voxel_count = next_int()?;
        if voxel_count <= 0 {
            return Err(PuzzleFileError::EmptyPiece {
                index: index as usize,
            });
        }
        let mut voxels = Vec::with_capacity(voxel_count as usize);
        for _ in 0..voxel_count {
            let x = next_int()? as i32;
            let z = next_int()? as i32;
            voxels.push((x, z));
        }
        pieces.push(Piece::new(voxels));
    }

    Ok(pieces)
}

/// Reads and parses a puzzle file from disk.
pub fn load_puzzle(path: &Path) -> Result<Vec<Rc<Piece>>, PuzzleFileError> {
    let source = fs::read_to_string(path)?;
    parse_puzzle(&source)
}

/// Scans a folder for candidate puzzle files: non-directory entries whose
/// first token is the magic number. A missing folder is not an error, just an
/// empty result.
pub fn detect_puzzle_files(folder: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(_) => {
            warn!("puzzle folder {} does not exist", folder.display());
            return found;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let Ok(source) = fs::read_to_string(&path) else {
            continue;
        };
        let magic = source
            .split_whitespace()
            .next()
            .and_then(|token| token.parse::<i64>().ok());
        if magic == Some(PUZZLE_MAGIC) {
            found.push(path);
        }
    }

    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::{POCKET, TRIPLE_BAR};
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn test_parse_triple_bar() {
        let pieces = parse_puzzle(TRIPLE_BAR).unwrap();
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].voxels, vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(pieces[2].voxels, vec![(2, 0), (2, 1), (2, 2)]);
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let source = "42\n1\n1\n0 0\n";
        match parse_puzzle(source) {
            Err(PuzzleFileError::BadMagic { found: 42 }) => {}
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_truncated_file() {
        let source = format!("{PUZZLE_MAGIC}\n2\n1\n0 0\n3\n1 1\n");
        assert!(matches!(
            parse_puzzle(&source),
            Err(PuzzleFileError::Truncated)
        ));
    }

    #[test]
    fn test_parse_rejects_garbage_tokens() {
        let source = format!("{PUZZLE_MAGIC}\ntwo\n");
        assert!(matches!(
            parse_puzzle(&source),
            Err(PuzzleFileError::BadInt(_))
        ));
    }

    #[test]
    fn test_parse_rejects_empty_piece_list() {
        let source = format!("{PUZZLE_MAGIC}\n0\n");
        assert!(matches!(parse_puzzle(&source), Err(PuzzleFileError::NoPieces)));
    }

    #[test]
    fn test_parse_rejects_piece_without_voxels() {
        let source = format!("{PUZZLE_MAGIC}\n1\n0\n");
        assert!(matches!(
            parse_puzzle(&source),
            Err(PuzzleFileError::EmptyPiece { index: 0 })
        ));
    }

    #[test]
    fn test_detect_puzzle_files_filters_on_magic() {
        let dir = std::env::temp_dir().join(format!(
            "burr-detect-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();

        File::create(dir.join("good.puz"))
            .unwrap()
            .write_all(POCKET.as_bytes())
            .unwrap();
        File::create(dir.join("other.txt"))
            .unwrap()
            .write_all(b"not a puzzle at all")
            .unwrap();

        let found = detect_puzzle_files(&dir);
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("good.puz"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_detect_missing_folder_is_empty() {
        let missing = std::env::temp_dir().join("burr-no-such-folder-xyz");
        assert!(detect_puzzle_files(&missing).is_empty());
    }
}
