use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    analysis::cfg::{CfgOptions, ControlFlowGraph},
    metadata::{token::Token, MethodDefinition},
    Result,
};

/// Build the control flow graphs of many methods in parallel.
///
/// Every build owns its own block registry, so methods are processed independently on the
/// rayon thread pool. Methods without a body are skipped. A failing method is reported in its
/// own result entry and does not affect the others.
///
/// The returned entries follow the order of `methods`.
///
/// # Arguments
///
/// * `methods` - The methods to analyze
/// * `options` - Optional passes, applied to every method
///
/// # Examples
///
/// ```rust,no_run
/// use cilflow::prelude::*;
///
/// let mut method = MethodDefinition::new(Token::new(0x0600_0001), "Run", CallingConvention::empty(), true);
/// method.decode_body(&[0x00, 0x2A], &())?;
///
/// for (token, result) in build_graphs(&[method], CfgOptions::full()) {
///     match result {
///         Ok(cfg) => println!("{token}: {} blocks", cfg.block_count()),
///         Err(e) => eprintln!("{token}: {e}"),
///     }
/// }
/// # Ok::<(), cilflow::Error>(())
/// ```
#[must_use]
pub fn build_graphs(
    methods: &[MethodDefinition],
    options: CfgOptions,
) -> Vec<(Token, Result<ControlFlowGraph<'_>>)> {
    let results: Vec<(Token, Result<ControlFlowGraph<'_>>)> = methods
        .par_iter()
        .filter_map(|method| {
            let body = method.body()?;
            let result = ControlFlowGraph::build(body, options);
            if let Err(error) = &result {
                warn!("skipping {} ({}): {error}", method.name, method.token);
            }
            Some((method.token, result))
        })
        .collect();

    debug!(
        "built graphs for {} of {} methods",
        results.iter().filter(|(_, result)| result.is_ok()).count(),
        methods.len()
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::CallingConvention, Error};

    fn method(row: u32, il: Option<&[u8]>) -> MethodDefinition {
        let mut method = MethodDefinition::new(
            Token::from_parts(Token::METHOD_DEF, row),
            format!("M{row}"),
            CallingConvention::empty(),
            true,
        );
        if let Some(il) = il {
            method.decode_body(il, &()).unwrap();
        }
        method
    }

    #[test]
    fn keeps_order_and_skips_bodiless() {
        let methods = vec![
            method(1, Some(&[0x00, 0x2A])),
            method(2, None),
            // br.s +0x10, target outside of the body
            method(3, Some(&[0x2B, 0x10, 0x2A])),
            method(4, Some(&[0x16, 0x2C, 0x00, 0x2A])),
        ];

        let results = build_graphs(&methods, CfgOptions::full());
        let tokens: Vec<u32> = results.iter().map(|(token, _)| token.row()).collect();
        assert_eq!(tokens, vec![1, 3, 4]);

        assert_eq!(results[0].1.as_ref().unwrap().block_count(), 1);
        assert!(matches!(
            results[1].1,
            Err(Error::BranchTargetNotFound { offset: 0, target: 0x12 })
        ));
        assert_eq!(results[2].1.as_ref().unwrap().block_count(), 1);
    }
}
