//! ASCII AIGER ("aag") reader/writer (SPEC_FULL.md §6a). The one
//! external on-disk format the core round-trips; binary AIGER and any
//! sequential extension (latches) are out of scope per §1's
//! Non-goals.
//!
//! Literal encoding follows the public AIGER spec: node id `n` has
//! literal `2n` (positive) / `2n+1` (negated); literal `0`/`1` are the
//! constant-0/1 terminals.

use crate::error::{Error, Result};
use crate::network::Network;
use std::io::{BufRead, Write};

fn lit(id: usize, complement: bool) -> usize {
    2 * id + usize::from(complement)
}

fn parse_lit(s: &str) -> Result<usize> {
    s.parse().map_err(|_| Error::AigerParse(format!("bad literal {s:?}")))
}

/// Parse an ASCII AIGER ("aag") file into a fresh `Network`.
///
/// The file's own node-id numbering does not survive; fanins/fanouts
/// are rebuilt against whatever ids `Network::add_pi`/`add_and` hand
/// out as PIs and AND gates are declared, in file order.
pub fn read(path: &std::path::Path) -> Result<Network> {
    let f = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(f);
    parse(reader.lines().map(|l| l.map_err(Error::from)))
}

pub(crate) fn parse<I: Iterator<Item = Result<String>>>(mut lines: I) -> Result<Network> {
    let header = lines
        .next()
        .ok_or_else(|| Error::AigerParse("empty file".into()))??;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() < 6 || fields[0] != "aag" {
        return Err(Error::AigerParse("missing 'aag' header".into()));
    }
    let num_inputs: usize = fields[2].parse().map_err(|_| Error::AigerParse("bad I count".into()))?;
    let num_latches: usize = fields[3].parse().map_err(|_| Error::AigerParse("bad L count".into()))?;
    let num_outputs: usize = fields[4].parse().map_err(|_| Error::AigerParse("bad O count".into()))?;
    let num_ands: usize = fields[5].parse().map_err(|_| Error::AigerParse("bad A count".into()))?;
    if num_latches != 0 {
        return Err(Error::Unsupported("sequential AIGER (latches) is out of scope".into()));
    }

    let mut net = Network::new();
    let mut lit_to_id: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    lit_to_id.insert(0, net.const0_id());

    for _ in 0..num_inputs {
        let line = lines
            .next()
            .ok_or_else(|| Error::AigerParse("truncated input section".into()))??;
        let l = parse_lit(line.trim())?;
        lit_to_id.insert(l, net.add_pi());
    }

    let mut output_lits = Vec::with_capacity(num_outputs);
    for _ in 0..num_outputs {
        let line = lines
            .next()
            .ok_or_else(|| Error::AigerParse("truncated output section".into()))??;
        output_lits.push(parse_lit(line.trim())?);
    }

    for _ in 0..num_ands {
        let line = lines
            .next()
            .ok_or_else(|| Error::AigerParse("truncated AND section".into()))??;
        let nums: Vec<&str> = line.split_whitespace().collect();
        if nums.len() != 3 {
            return Err(Error::AigerParse(format!("malformed AND line {line:?}")));
        }
        let out_lit = parse_lit(nums[0])?;
        let fi0 = parse_lit(nums[1])?;
        let fi1 = parse_lit(nums[2])?;
        let resolve = |lit_to_id: &std::collections::HashMap<usize, usize>, l: usize| -> Result<(usize, bool)> {
            let var = l / 2;
            let c = l % 2 == 1;
            lit_to_id
                .get(&(2 * var))
                .map(|&id| (id, c))
                .ok_or_else(|| Error::AigerParse(format!("AND references undeclared literal {l}")))
        };
        let a = resolve(&lit_to_id, fi0)?;
        let b = resolve(&lit_to_id, fi1)?;
        let new_id = net.add_and(vec![a, b]);
        lit_to_id.insert(out_lit & !1usize, new_id);
    }

    for out_lit in output_lits {
        let var = out_lit / 2;
        let c = out_lit % 2 == 1;
        let &id = lit_to_id
            .get(&(2 * var))
            .ok_or_else(|| Error::AigerParse(format!("output references undeclared literal {out_lit}")))?;
        net.add_po(id, c);
    }

    Ok(net)
}

/// Parse an in-memory ASCII AIGER buffer, used by the scheduler to
/// ship job networks between threads without touching disk.
pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Network> {
    let cursor = std::io::Cursor::new(bytes);
    parse(cursor.lines().map(|l| l.map_err(Error::from)))
}

/// Write `net` out as an ASCII AIGER ("aag") file. Node ids are
/// renumbered densely in topological order; the file's own I/O
/// literal numbering has no relationship to `Network`'s internal ids.
pub fn write(net: &Network, path: &std::path::Path) -> Result<()> {
    let f = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(f);
    let bytes = render(net);
    w.write_all(&bytes)?;
    Ok(())
}

pub(crate) fn render(net: &Network) -> Vec<u8> {
    let mut id_to_var: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    id_to_var.insert(net.const0_id(), 0);
    let mut next_var = 1usize;
    for &pi in net.pis() {
        id_to_var.insert(pi, next_var);
        next_var += 1;
    }
    let mut and_lines = Vec::new();
    net.for_each_int(|id| {
        let fanins: Vec<(usize, bool)> = net.fanins(id).to_vec();
        let fanin_lits: Vec<usize> = fanins.iter().map(|&(fi, c)| lit(*id_to_var.get(&fi).unwrap(), c)).collect();

        // AIGER requires each AND line's output variable to exceed
        // every variable in its inputs, so intermediate folds (lower,
        // earlier in the chain) must be allocated before `id`'s own
        // variable (the chain's final, outermost AND).
        let mut acc = fanin_lits[0];
        for &fi_lit in &fanin_lits[1..fanin_lits.len() - 1] {
            let inter_var = next_var;
            next_var += 1;
            and_lines.push(format!("{} {} {}", lit(inter_var, false), acc, fi_lit));
            acc = lit(inter_var, false);
        }
        let var = next_var;
        next_var += 1;
        id_to_var.insert(id, var);
        and_lines.push(format!("{} {} {}", lit(var, false), acc, *fanin_lits.last().unwrap()));
    });

    let mut out = String::new();
    out.push_str(&format!("aag {} {} 0 {} {}\n", next_var - 1, net.num_pis(), net.num_pos(), and_lines.len()));
    for &pi in net.pis() {
        out.push_str(&format!("{}\n", lit(*id_to_var.get(&pi).unwrap(), false)));
    }
    for &(src, c) in &net.po_drivers() {
        out.push_str(&format!("{}\n", lit(*id_to_var.get(&src).unwrap(), c)));
    }
    for line in &and_lines {
        out.push_str(line);
        out.push('\n');
    }
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_small_network() {
        let mut net = Network::new();
        let a = net.add_pi();
        let b = net.add_pi();
        let t = net.add_and(vec![(a, false), (b, true)]);
        let _p = net.add_po(t, false);

        let bytes = render(&net);
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<Result<String>> = text.lines().map(|l| Ok(l.to_string())).collect();
        let parsed = parse(lines.into_iter()).unwrap();

        assert_eq!(parsed.num_pis(), 2);
        assert_eq!(parsed.num_pos(), 1);
        assert_eq!(parsed.num_nodes(), net.num_nodes());
    }
}
