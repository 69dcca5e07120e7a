//! Just enough of the Solidity ABI for the game contract: static `uint256` and
//! `address` words plus the two dynamic arrays returned by `getLeaderboard`.

use super::{
    ContractError,
    LeaderboardRow,
    PlayerScore,
};
use sha3::{
    Digest,
    Keccak256,
};

pub const SUBMIT_SCORE: &str = "submitScore(uint256)";
pub const GET_LEADERBOARD: &str = "getLeaderboard()";
pub const GET_PLAYER_SCORE: &str = "getPlayerScore(address)";
pub const GAME_FEE: &str = "gameFee()";

const WORD: usize = 32;

pub type Word = [u8; WORD];

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

pub fn uint_word(value: u128) -> Word {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn address_word(address: &str) -> Result<Word, ContractError> {
    let raw = strip_hex_prefix(address);
    let bytes = hex::decode(raw)
        .map_err(|e| ContractError::Decode(format!("address {address}: {e}")))?;
    if bytes.len() != 20 {
        return Err(ContractError::Decode(format!(
            "address {address} is {} bytes, expected 20",
            bytes.len()
        )));
    }
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

/// `0x`-prefixed calldata for `signature` applied to static arguments.
pub fn calldata(signature: &str, args: &[Word]) -> String {
    let mut bytes = Vec::with_capacity(4 + args.len() * WORD);
    bytes.extend_from_slice(&selector(signature));
    for arg in args {
        bytes.extend_from_slice(arg);
    }
    format!("0x{}", hex::encode(bytes))
}

pub fn decode_words(data: &str) -> Result<Vec<Word>, ContractError> {
    let bytes = hex::decode(strip_hex_prefix(data))
        .map_err(|e| ContractError::Decode(e.to_string()))?;
    if bytes.len() % WORD != 0 {
        return Err(ContractError::Decode(format!(
            "return data length {} is not a multiple of {WORD}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(WORD)
        .map(|chunk| {
            let mut word = [0u8; WORD];
            word.copy_from_slice(chunk);
            word
        })
        .collect())
}

pub fn word_to_u128(word: &Word) -> Result<u128, ContractError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(ContractError::Decode("uint256 does not fit in 128 bits".into()));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

pub fn word_to_u64(word: &Word) -> Result<u64, ContractError> {
    let value = word_to_u128(word)?;
    u64::try_from(value)
        .map_err(|_| ContractError::Decode(format!("value {value} does not fit in 64 bits")))
}

pub fn word_to_address(word: &Word) -> String {
    format!("0x{}", hex::encode(&word[12..]))
}

fn word_to_index(word: &Word) -> Result<usize, ContractError> {
    usize::try_from(word_to_u64(word)?)
        .map_err(|_| ContractError::Decode("offset out of range".into()))
}

fn word_at(words: &[Word], idx: usize) -> Result<&Word, ContractError> {
    words
        .get(idx)
        .ok_or_else(|| ContractError::Decode(format!("missing word {idx}")))
}

/// Reads a dynamic array whose head offset sits at word `head`.
fn dynamic_array<'a>(words: &'a [Word], head: usize) -> Result<&'a [Word], ContractError> {
    let offset = word_to_index(word_at(words, head)?)?;
    if offset % WORD != 0 {
        return Err(ContractError::Decode(format!("unaligned offset {offset}")));
    }
    let start = offset / WORD;
    let len = word_to_index(word_at(words, start)?)?;
    let end = start
        .checked_add(1)
        .and_then(|first| first.checked_add(len))
        .ok_or_else(|| ContractError::Decode(format!("array length {len} overflows")))?;
    words
        .get(start + 1..end)
        .ok_or_else(|| ContractError::Decode(format!("array of {len} runs past data")))
}

pub fn decode_player_score(data: &str) -> Result<PlayerScore, ContractError> {
    let words = decode_words(data)?;
    Ok(PlayerScore {
        high_score: word_to_u64(word_at(&words, 0)?)?,
        total_games: word_to_u64(word_at(&words, 1)?)?,
        last_played: word_to_u64(word_at(&words, 2)?)?,
    })
}

pub fn decode_leaderboard(data: &str) -> Result<Vec<LeaderboardRow>, ContractError> {
    let words = decode_words(data)?;
    let addresses = dynamic_array(&words, 0)?;
    let scores = dynamic_array(&words, 1)?;
    if addresses.len() != scores.len() {
        return Err(ContractError::Decode(format!(
            "{} addresses but {} scores",
            addresses.len(),
            scores.len()
        )));
    }
    addresses
        .iter()
        .zip(scores)
        .map(|(address, score)| {
            Ok(LeaderboardRow {
                address: word_to_address(address),
                score: word_to_u64(score)?,
            })
        })
        .collect()
}

pub fn decode_uint(data: &str) -> Result<u128, ContractError> {
    let words = decode_words(data)?;
    word_to_u128(word_at(&words, 0)?)
}

fn strip_hex_prefix(raw: &str) -> &str {
    raw.strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw)
}
