/// Map typed input onto a choice index.
///
/// Input equal to a choice's text picks that choice; otherwise a number is a
/// 1-based position. Numeric choices therefore resolve by text: with choices
/// `2 4 6 8`, typing `4` picks `"4"`.
pub fn pick_choice(choices: &[String], input: &str) -> Option<usize> {
    let input = input.trim();
    if let Some(index) = choices.iter().position(|c| c.trim() == input) {
        return Some(index);
    }
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .filter(|index| *index < choices.len())
}
