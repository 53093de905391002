//! Proof-number opening book.
//!
//! The book is a preorder dump of a proof-number search tree: fixed 13-byte
//! records, each immediately followed by the records of its children.
//!
//! | bytes | field                                            |
//! |-------|--------------------------------------------------|
//! | 0     | from square, rank flipped                        |
//! | 1     | to square, rank flipped                          |
//! | 2     | promotion, signed; negative flips the colour     |
//! | 3     | en-passant marker                                |
//! | 4-7   | proof number, little endian                      |
//! | 8-11  | disproof number, little endian                   |
//! | 12    | number of children                               |

use crate::board::ChessMove;
use crate::error::BookError;
use byteorder::{ByteOrder, LittleEndian};
use flate2::read::MultiGzDecoder;
use shakmaty::{Color, Piece, Role, Square};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Size in bytes of one book record.
pub const RECORD_LEN: usize = 13;

const PROGRESS_INTERVAL: usize = 100_000;

/// Index of a node inside an `OpeningBook`.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub struct BookNodeId(usize);

/// One position in the book, reached by `chess_move` from its parent.
#[derive(Debug, Clone)]
pub struct BookNode {
    pub chess_move: ChessMove,
    /// Stored as read; the search never looks at it.
    pub en_passant: i8,
    pub proof: u32,
    pub disproof: u32,
    /// `proof / disproof` for a leaf, otherwise the minimum of `1 / ratio`
    /// over the children. Positive infinity when the divisor is zero.
    pub ratio: f64,
    pub parent: Option<BookNodeId>,
    pub children: Vec<BookNodeId>,
    /// Number of nodes in the subtree rooted here, this one included.
    pub size: u64,
}

/// One decoded 13-byte record.
#[derive(Debug, PartialEq, Clone)]
pub struct BookRecord {
    pub chess_move: ChessMove,
    pub en_passant: i8,
    pub proof: u32,
    pub disproof: u32,
    pub child_count: u8,
}

impl BookRecord {
    /// Decodes a record, failing only on an out-of-range square.
    pub fn decode(buf: &[u8; RECORD_LEN]) -> Result<Self, BookError> {
        let from = decode_square(buf[0])?;
        let to = decode_square(buf[1])?;
        let mut chess_move = ChessMove::new(from, to);
        chess_move.promotion = decode_promotion(buf[2] as i8);

        Ok(Self {
            chess_move,
            en_passant: buf[3] as i8,
            proof: LittleEndian::read_u32(&buf[4..8]),
            disproof: LittleEndian::read_u32(&buf[8..12]),
            child_count: buf[12],
        })
    }
}

fn decode_square(raw: u8) -> Result<Square, BookError> {
    if raw > 63 {
        return Err(BookError::InvalidSquare(raw));
    }
    let flipped = 8 * (7 - u32::from(raw) / 8) + u32::from(raw) % 8;
    Ok(Square::new(flipped))
}

fn decode_promotion(raw: i8) -> Option<Piece> {
    let role = match raw.unsigned_abs() {
        0 => return None,
        1 => {
            warn!("book promotes to a pawn");
            Role::Pawn
        }
        2 => Role::Knight,
        3 => Role::Bishop,
        4 => Role::Rook,
        5 => Role::Queen,
        6 => Role::King,
        other => {
            warn!(promotion = other, "unknown promotion code in book, ignoring it");
            return None;
        }
    };
    let color = if raw < 0 { Color::Black } else { Color::White };
    Some(Piece { color, role })
}

/// Leaf ratio; a zero disproof number gives positive infinity.
pub fn leaf_ratio(proof: u32, disproof: u32) -> f64 {
    if disproof == 0 {
        f64::INFINITY
    } else {
        f64::from(proof) / f64::from(disproof)
    }
}

/// Internal ratio: the smallest reciprocal of the children's ratios.
pub fn internal_ratio<I: IntoIterator<Item = f64>>(child_ratios: I) -> f64 {
    child_ratios
        .into_iter()
        .map(|r| 1.0 / r)
        .fold(f64::INFINITY, f64::min)
}

/// A read-only opening book, built once at load time.
#[derive(Debug, Clone)]
pub struct OpeningBook {
    nodes: Vec<BookNode>,
}

struct PendingNode {
    id: BookNodeId,
    remaining: u8,
}

impl OpeningBook {
    /// Loads a gzip-compressed book from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BookError> {
        let file = File::open(path.as_ref())?;
        info!(path = %path.as_ref().display(), "loading opening book");
        Self::from_gzip_reader(BufReader::new(file))
    }

    /// Loads a book from disk, logging and returning `None` on failure.
    pub fn load_or_none<P: AsRef<Path>>(path: P) -> Option<Self> {
        match Self::from_path(path.as_ref()) {
            Ok(book) => Some(book),
            Err(err) => {
                warn!(path = %path.as_ref().display(), %err, "continuing without opening book");
                None
            }
        }
    }

    /// Parses a gzip stream. Concatenated gzip members are read as one stream.
    pub fn from_gzip_reader<R: Read>(reader: R) -> Result<Self, BookError> {
        Self::from_reader(MultiGzDecoder::new(reader))
    }

    /// Parses uncompressed records.
    ///
    /// Only a missing or malformed first record is an error. A short read,
    /// an I/O error or a malformed record further in stops parsing; every node
    /// read so far is kept and finished as if its remaining children did not
    /// exist.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, BookError> {
        let mut buf = [0u8; RECORD_LEN];
        if !read_record(&mut reader, &mut buf)? {
            return Err(BookError::Empty);
        }
        let root = BookRecord::decode(&buf)?;

        let mut book = OpeningBook { nodes: Vec::new() };
        let remaining = root.child_count;
        let root_id = book.push(root, None);
        let mut pending = vec![PendingNode {
            id: root_id,
            remaining,
        }];

        while let Some(top) = pending.last_mut() {
            if top.remaining == 0 {
                let id = top.id;
                pending.pop();
                book.finish(id);
                continue;
            }
            top.remaining -= 1;
            let parent = top.id;

            let record = match read_record(&mut reader, &mut buf) {
                Ok(true) => BookRecord::decode(&buf),
                Ok(false) => break,
                Err(err) => Err(err),
            };
            match record {
                Ok(record) => {
                    let remaining = record.child_count;
                    let id = book.push(record, Some(parent));
                    pending.push(PendingNode { id, remaining });
                }
                Err(err) => {
                    warn!(%err, nodes = book.len(), "stopping opening book parse");
                    break;
                }
            }
        }

        if !pending.is_empty() {
            warn!(
                unfinished = pending.len(),
                "opening book is truncated, keeping the part that was read"
            );
        }
        while let Some(top) = pending.pop() {
            book.finish(top.id);
        }

        info!(nodes = book.len(), "opening book loaded");
        Ok(book)
    }

    fn push(&mut self, record: BookRecord, parent: Option<BookNodeId>) -> BookNodeId {
        let id = BookNodeId(self.nodes.len());
        self.nodes.push(BookNode {
            chess_move: record.chess_move,
            en_passant: record.en_passant,
            proof: record.proof,
            disproof: record.disproof,
            ratio: 0.0,
            parent,
            children: Vec::with_capacity(usize::from(record.child_count)),
            size: 1,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        if self.nodes.len() % PROGRESS_INTERVAL == 0 {
            debug!(nodes = self.nodes.len(), "opening book nodes loaded");
        }
        id
    }

    /// Computes the ratio of a node whose children are complete and adds its
    /// size to the parent.
    fn finish(&mut self, id: BookNodeId) {
        let node = &self.nodes[id.0];
        let ratio = if node.children.is_empty() {
            leaf_ratio(node.proof, node.disproof)
        } else {
            internal_ratio(node.children.iter().map(|c| self.nodes[c.0].ratio))
        };
        let size = node.size;
        let parent = node.parent;

        self.nodes[id.0].ratio = ratio;
        if let Some(parent) = parent {
            self.nodes[parent.0].size += size;
        }
    }

    /// The node for the starting position.
    pub fn root(&self) -> BookNodeId {
        BookNodeId(0)
    }

    /// Looks up a node; `None` for ids from another book.
    pub fn node(&self, id: BookNodeId) -> Option<&BookNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes read.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false` for a loaded book, which has at least a root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The move of the child with the strictly highest positive ratio; the
    /// first one wins ties.
    pub fn find_best_move(&self, node: Option<BookNodeId>) -> Option<ChessMove> {
        let node = self.node(node?)?;
        let mut best_ratio = 0.0;
        let mut best_move = None;
        for child in node.children.iter().filter_map(|&c| self.node(c)) {
            if child.ratio > best_ratio {
                best_ratio = child.ratio;
                best_move = Some(child.chess_move);
            }
        }
        best_move
    }

    /// Follows `chess_move` from `node`; `None` once the game has left the book.
    pub fn apply_move(&self, node: Option<BookNodeId>, chess_move: &ChessMove) -> Option<BookNodeId> {
        let node = self.node(node?)?;
        node.children
            .iter()
            .copied()
            .find(|&c| self.node(c).is_some_and(|child| child.chess_move == *chess_move))
    }
}

/// Fills `buf` with one record. Returns `false` at end of stream, including
/// a partial record at the very end.
fn read_record<R: Read>(reader: &mut R, buf: &mut [u8; RECORD_LEN]) -> Result<bool, BookError> {
    let mut filled = 0;
    while filled < RECORD_LEN {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }

    match filled {
        0 => {
            debug!("reached end of opening book stream");
            Ok(false)
        }
        RECORD_LEN => Ok(true),
        partial => {
            warn!(bytes = partial, "short record at end of opening book stream");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{internal_ratio, leaf_ratio, BookNodeId, OpeningBook, RECORD_LEN};
    use crate::board::ChessMove;
    use crate::error::BookError;
    use crate::random::{RandomGenerator, SeededRandomGenerator};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use shakmaty::{Color, Piece, Role, Square};
    use std::io::Write;

    /// Inverse of the rank flip applied when reading squares.
    fn raw_square(square: Square) -> u8 {
        let index = square as u8;
        8 * (7 - index / 8) + index % 8
    }

    fn record(from: Square, to: Square, promotion: i8, proof: u32, disproof: u32, children: u8) -> Vec<u8> {
        let mut bytes = vec![raw_square(from), raw_square(to), promotion as u8, 0];
        bytes.extend_from_slice(&proof.to_le_bytes());
        bytes.extend_from_slice(&disproof.to_le_bytes());
        bytes.push(children);
        assert_eq!(bytes.len(), RECORD_LEN);
        bytes
    }

    /// root -> { e2e3 (leaf 1/4), e2e4 -> { d7d5 (leaf 2/1), b7b5 (leaf 3/0) }, g1f3 (leaf 1/1) }
    fn sample_book() -> Vec<u8> {
        [
            record(Square::A1, Square::A1, 0, 0, 0, 3),
            record(Square::E2, Square::E3, 0, 1, 4, 0),
            record(Square::E2, Square::E4, 0, 9, 9, 2),
            record(Square::D7, Square::D5, 0, 2, 1, 0),
            record(Square::B7, Square::B5, 0, 3, 0, 0),
            record(Square::G1, Square::F3, 0, 1, 1, 0),
        ]
        .concat()
    }

    fn child(book: &OpeningBook, node: BookNodeId, index: usize) -> BookNodeId {
        book.node(node).unwrap().children[index]
    }

    #[test]
    fn parses_preorder_records() {
        let book = OpeningBook::from_reader(sample_book().as_slice()).unwrap();

        assert_eq!(book.len(), 6);
        let root = book.node(book.root()).unwrap();
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.size, 6);

        let e4 = book.node(child(&book, book.root(), 1)).unwrap();
        assert_eq!(e4.chess_move, ChessMove::new(Square::E2, Square::E4));
        assert_eq!(e4.proof, 9);
        assert_eq!(e4.size, 3);
        assert_eq!(e4.parent, Some(book.root()));
        // children ratios 2 and infinity: min(1/2, 0) = 0
        assert_eq!(e4.ratio, 0.0);

        let e3 = book.node(child(&book, book.root(), 0)).unwrap();
        assert_eq!(e3.ratio, 0.25);
        // min(1/0.25, 1/0, 1/1) = 1
        assert_eq!(root.ratio, 1.0);
    }

    #[test]
    fn best_move_has_highest_ratio() {
        let book = OpeningBook::from_reader(sample_book().as_slice()).unwrap();

        // e3 = 0.25, e4 = 0, f3 = 1
        assert_eq!(
            book.find_best_move(Some(book.root())),
            Some(ChessMove::new(Square::G1, Square::F3))
        );

        // b5 (infinite) beats d5 (2)
        let e4 = book.apply_move(Some(book.root()), &ChessMove::new(Square::E2, Square::E4));
        assert_eq!(
            book.find_best_move(e4),
            Some(ChessMove::new(Square::B7, Square::B5))
        );
    }

    #[test]
    fn leaving_the_book_is_permanent() {
        let book = OpeningBook::from_reader(sample_book().as_slice()).unwrap();

        let out = book.apply_move(Some(book.root()), &ChessMove::new(Square::A2, Square::A4));
        assert_eq!(out, None);
        assert_eq!(book.find_best_move(out), None);
        assert_eq!(book.apply_move(out, &ChessMove::new(Square::E2, Square::E4)), None);

        let leaf = book.apply_move(Some(book.root()), &ChessMove::new(Square::E2, Square::E3));
        assert!(leaf.is_some());
        assert_eq!(book.find_best_move(leaf), None);
    }

    #[test]
    fn ties_favour_the_first_child() {
        let bytes = [
            record(Square::A1, Square::A1, 0, 0, 0, 2),
            record(Square::E2, Square::E3, 0, 1, 1, 0),
            record(Square::E2, Square::E4, 0, 1, 1, 0),
        ]
        .concat();
        let book = OpeningBook::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(
            book.find_best_move(Some(book.root())),
            Some(ChessMove::new(Square::E2, Square::E3))
        );
    }

    #[test]
    fn decodes_promotions_with_colour() {
        let bytes = [
            record(Square::A1, Square::A1, 0, 0, 0, 2),
            record(Square::B7, Square::B8, 5, 1, 1, 0),
            record(Square::B2, Square::B1, -6, 1, 1, 0),
        ]
        .concat();
        let book = OpeningBook::from_reader(bytes.as_slice()).unwrap();

        let white = book.node(child(&book, book.root(), 0)).unwrap();
        assert_eq!(
            white.chess_move.promotion,
            Some(Piece {
                color: Color::White,
                role: Role::Queen
            })
        );
        let black = book.node(child(&book, book.root(), 1)).unwrap();
        assert_eq!(
            black.chess_move.promotion,
            Some(Piece {
                color: Color::Black,
                role: Role::King
            })
        );
        assert_eq!(black.chess_move.to_string(), "b2b1k");
    }

    #[test]
    fn truncated_stream_keeps_what_was_read() {
        let mut bytes = sample_book();
        // drop the last leaf and half of the one before it
        bytes.truncate(RECORD_LEN * 4 + 6);

        let book = OpeningBook::from_reader(bytes.as_slice()).unwrap();

        assert_eq!(book.len(), 4);
        let root = book.node(book.root()).unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.size, 4);
        let e4 = book.node(child(&book, book.root(), 1)).unwrap();
        assert_eq!(e4.children.len(), 1);
        // only d5 (ratio 2) was read under e4
        assert_eq!(e4.ratio, 0.5);
    }

    #[test]
    fn malformed_record_stops_parsing() {
        let mut bytes = sample_book();
        bytes[RECORD_LEN * 2] = 200;

        let book = OpeningBook::from_reader(bytes.as_slice()).unwrap();

        assert_eq!(book.len(), 2);
        assert_eq!(book.node(book.root()).unwrap().ratio, 4.0);
    }

    #[test]
    fn empty_stream_is_an_error() {
        let empty: &[u8] = &[];
        assert!(matches!(OpeningBook::from_reader(empty), Err(BookError::Empty)));
        let short: &[u8] = &[1, 2, 3];
        assert!(matches!(OpeningBook::from_reader(short), Err(BookError::Empty)));
    }

    #[test]
    fn reads_gzip_streams() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&sample_book()).unwrap();
        let compressed = encoder.finish().unwrap();

        let book = OpeningBook::from_gzip_reader(compressed.as_slice()).unwrap();

        assert_eq!(book.len(), 6);
        assert!(OpeningBook::from_gzip_reader(&b"not gzip at all"[..]).is_err());
    }

    #[test]
    fn reads_concatenated_gzip_members() {
        let bytes = sample_book();
        let (head, tail) = bytes.split_at(RECORD_LEN * 2 + 5);
        let mut compressed = Vec::new();
        for part in [head, tail] {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(part).unwrap();
            compressed.extend(encoder.finish().unwrap());
        }

        let book = OpeningBook::from_gzip_reader(compressed.as_slice()).unwrap();

        assert_eq!(book.len(), 6);
        assert_eq!(book.node(book.root()).unwrap().size, 6);
    }

    #[test]
    fn missing_file_degrades_to_no_book() {
        assert!(OpeningBook::load_or_none("/nonexistent/book.in.gz").is_none());
    }

    #[test]
    fn ratio_arithmetic_handles_infinity() {
        assert_eq!(leaf_ratio(3, 0), f64::INFINITY);
        assert_eq!(leaf_ratio(0, 0), f64::INFINITY);
        assert_eq!(leaf_ratio(1, 4), 0.25);
        assert_eq!(internal_ratio([f64::INFINITY]), 0.0);
        assert_eq!(internal_ratio([0.0]), f64::INFINITY);
        assert_eq!(internal_ratio([2.0, 4.0]), 0.25);
    }

    /// Writes a random tree in preorder and returns the number of records.
    fn random_subtree(crg: &mut SeededRandomGenerator, depth: usize, out: &mut Vec<u8>) -> usize {
        let children = if depth == 0 { 0 } else { crg.next_range(0, 5) };
        let proof = crg.next_range(0, 20) as u32;
        let disproof = crg.next_range(0, 20) as u32;
        let from = Square::new(crg.next_range(0, 64) as u32);
        let to = Square::new(crg.next_range(0, 64) as u32);
        out.extend(record(from, to, 0, proof, disproof, children as u8));
        1 + (0..children)
            .map(|_| random_subtree(crg, depth - 1, out))
            .sum::<usize>()
    }

    #[test]
    fn ratios_follow_recursive_definition() {
        for seed in 0..50 {
            let mut crg = SeededRandomGenerator::new(seed);
            let mut bytes = Vec::new();
            let count = random_subtree(&mut crg, 4, &mut bytes);

            let book = OpeningBook::from_reader(bytes.as_slice()).unwrap();

            assert_eq!(book.len(), count);
            assert_eq!(book.node(book.root()).unwrap().size as usize, count);
            for index in 0..book.len() {
                let node = book.node(BookNodeId(index)).unwrap();
                let expected = if node.children.is_empty() {
                    leaf_ratio(node.proof, node.disproof)
                } else {
                    node.children
                        .iter()
                        .map(|&c| 1.0 / book.node(c).unwrap().ratio)
                        .fold(f64::INFINITY, f64::min)
                };
                assert_eq!(node.ratio, expected, "seed {seed}, node {index}");
                let size: u64 = 1 + node
                    .children
                    .iter()
                    .map(|&c| book.node(c).unwrap().size)
                    .sum::<u64>();
                assert_eq!(node.size, size);
            }
        }
    }
}
