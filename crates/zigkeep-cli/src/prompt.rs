use std::io::{BufRead, Write};

use anyhow::{anyhow, Context, Result};

fn read_answer<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
) -> Result<String> {
    write!(output, "{prompt}").context("failed writing prompt")?;
    output.flush().context("failed flushing prompt")?;
    let mut line = String::new();
    input.read_line(&mut line).context("failed reading answer")?;
    Ok(line.trim().to_string())
}

fn write_numbered<W: Write>(output: &mut W, title: &str, items: &[String]) -> Result<()> {
    writeln!(output, "{title}").context("failed writing prompt")?;
    for (index, item) in items.iter().enumerate() {
        writeln!(output, "{:>3}) {item}", index + 1).context("failed writing prompt")?;
    }
    Ok(())
}

/// `[Y/n]` confirmation. End of input counts as "no".
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<bool> {
    let mut line = String::new();
    write!(output, "{question} [Y/n] ").context("failed writing prompt")?;
    output.flush().context("failed flushing prompt")?;
    let read = input.read_line(&mut line).context("failed reading answer")?;
    if read == 0 {
        return Ok(false);
    }
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "" | "y" | "yes"
    ))
}

/// Numbered single choice. Empty input selects nothing.
pub fn select_one<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    title: &str,
    items: &[String],
) -> Result<Option<usize>> {
    write_numbered(output, title, items)?;
    let answer = read_answer(input, output, "Select a number (empty to cancel): ")?;
    let selected = parse_selection(&answer, items.len())?;
    match selected.as_slice() {
        [] => Ok(None),
        [index] => Ok(Some(*index)),
        _ => Err(anyhow!("select exactly one entry")),
    }
}

/// Numbered multi choice. Empty input selects nothing.
pub fn select_many<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    title: &str,
    items: &[String],
) -> Result<Vec<usize>> {
    write_numbered(output, title, items)?;
    let answer = read_answer(
        input,
        output,
        "Select numbers separated by commas or spaces (empty to cancel): ",
    )?;
    parse_selection(&answer, items.len())
}

/// Parses 1-based indices separated by commas or whitespace into sorted,
/// de-duplicated 0-based indices.
pub fn parse_selection(answer: &str, len: usize) -> Result<Vec<usize>> {
    let mut selected = Vec::new();
    for token in answer
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
    {
        let number = token
            .parse::<usize>()
            .with_context(|| format!("invalid selection '{token}'"))?;
        if number == 0 || number > len {
            return Err(anyhow!("selection {number} is out of range 1-{len}"));
        }
        selected.push(number - 1);
    }
    selected.sort_unstable();
    selected.dedup();
    Ok(selected)
}
