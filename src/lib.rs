//! Fixed-capacity LIFO stacks in three progressively more concurrent
//! flavors: an unsynchronized baseline ([`BoundedStack`]), a mutex-guarded
//! wrapper ([`LockedStack`]), and a CAS-only variant ([`LockFreeStack`])
//! that packs its index and an exclusive-write flag into one atomic word.
//! The lock-free variant reproduces a classic flawed design on purpose;
//! see its docs before reaching for it.

mod bounded;
mod locked;
mod lockfree;

pub use bounded::BoundedStack;
pub use locked::LockedStack;
pub use lockfree::LockFreeStack;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy)]
    enum StackOp {
        Push(u32),
        TryPop,
    }

    /// Runs one push/try_pop script against all three variants and checks
    /// they produce identical observable results, including a final
    /// drain. This is the regression property tying the variants
    /// together: single-threaded, they must be indistinguishable.
    fn assert_variants_agree(script: &[StackOp]) {
        // Capacity = script length, so no script can overflow.
        let mut bounded = BoundedStack::new();
        bounded.configure(script.len());
        let mut locked = LockedStack::new();
        locked.configure(script.len());
        let mut lockfree = LockFreeStack::new();
        lockfree.configure(script.len());

        for op in script {
            match *op {
                StackOp::Push(value) => {
                    bounded.push(value);
                    locked.push(value);
                    lockfree.push(value);
                }
                StackOp::TryPop => {
                    let expected = bounded.try_pop();
                    assert_eq!(locked.try_pop(), expected);
                    assert_eq!(lockfree.try_pop(), expected);
                }
            }
        }

        assert_eq!(locked.len(), bounded.len());
        assert_eq!(lockfree.len(), bounded.len());

        loop {
            let expected = bounded.try_pop();
            assert_eq!(locked.try_pop(), expected);
            assert_eq!(lockfree.try_pop(), expected);
            if expected.is_none() {
                break;
            }
        }
    }

    #[test]
    fn variants_agree_on_fixed_script() {
        use StackOp::*;
        assert_variants_agree(&[
            Push(1),
            Push(2),
            TryPop,
            Push(3),
            Push(4),
            TryPop,
            TryPop,
            TryPop,
            TryPop,
            Push(5),
            TryPop,
        ]);
    }

    #[test]
    fn variants_agree_on_example_scenario() {
        use StackOp::*;
        // The canonical scenario: push 1, 2, 3; pops yield 3, 2, 1, then
        // empty.
        assert_variants_agree(&[Push(1), Push(2), Push(3), TryPop, TryPop, TryPop, TryPop]);
    }

    #[test]
    fn variants_agree_on_random_scripts() {
        for _ in 0..32 {
            let script: Vec<StackOp> = (0..256)
                .map(|_| {
                    if rand::random::<bool>() {
                        StackOp::Push(rand::random::<u32>())
                    } else {
                        StackOp::TryPop
                    }
                })
                .collect();
            assert_variants_agree(&script);
        }
    }
}
