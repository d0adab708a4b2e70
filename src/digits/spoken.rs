//! Spoken-numeral extraction for recogniser transcripts.
//!
//! Recognisers return words, not digits: a Mandarin transcript of "五七"
//! or an English one of "five seven" both mean `57`.  Whitespace and
//! anything that is not a numeral are dropped.

/// Convert the numerals in `transcript` to ASCII digits.
///
/// Understands ASCII digits, Chinese numerals (`零〇一二两三四五六七八九`)
/// and the English digit words `zero`/`oh` through `nine`.
///
/// ```
/// use digit_span::digits::extract_spoken_digits;
///
/// assert_eq!(extract_spoken_digits("五 七"), "57");
/// assert_eq!(extract_spoken_digits("four, eight, two"), "482");
/// assert_eq!(extract_spoken_digits("3两1"), "321");
/// ```
pub fn extract_spoken_digits(transcript: &str) -> String {
    let mut digits = String::new();
    let mut word = String::new();

    for c in transcript.chars() {
        if c.is_ascii_alphabetic() {
            word.push(c.to_ascii_lowercase());
            continue;
        }
        flush_word(&mut word, &mut digits);

        if c.is_ascii_digit() {
            digits.push(c);
        } else if let Some(d) = chinese_numeral(c) {
            digits.push(d);
        }
    }
    flush_word(&mut word, &mut digits);

    digits
}

fn flush_word(word: &mut String, digits: &mut String) {
    if let Some(d) = english_digit_word(word) {
        digits.push(d);
    }
    word.clear();
}

fn chinese_numeral(c: char) -> Option<char> {
    let d = match c {
        '零' | '〇' => '0',
        '一' => '1',
        '二' | '两' => '2',
        '三' => '3',
        '四' => '4',
        '五' => '5',
        '六' => '6',
        '七' => '7',
        '八' => '8',
        '九' => '9',
        _ => return None,
    };
    Some(d)
}

fn english_digit_word(word: &str) -> Option<char> {
    let d = match word {
        "zero" | "oh" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        _ => return None,
    };
    Some(d)
}
