extern crate alloc;

use crate::*;
use frame::deps::frame_benchmarking::v2::*;
use frame::deps::frame_support::traits::EnsureOrigin;
use primitives::params::{PERCENTAGE_DENOMINATOR, UNIT};

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn deposit() {
    let base = T::BaseAsset::get();
    let origin =
      T::ParentOrigin::try_successful_origin().expect("ParentOrigin must have a successful origin");

    #[extrinsic_call]
    deposit(
      origin,
      base,
      100 * UNIT,
      Some(base),
      0,
      50 * UNIT,
      alloc::vec::Vec::new(),
    );

    assert_eq!(CollectionAllowances::<T>::get(base), 50 * UNIT);
  }

  #[benchmark]
  fn withdraw() {
    let base = T::BaseAsset::get();
    let origin =
      T::ParentOrigin::try_successful_origin().expect("ParentOrigin must have a successful origin");

    #[extrinsic_call]
    withdraw(
      origin,
      PERCENTAGE_DENOMINATOR,
      base,
      None,
      0,
      0,
      alloc::vec::Vec::new(),
    );

    assert_eq!(CollectionAllowances::<T>::get(base), 0);
  }

  #[benchmark]
  fn rebalance() {
    let origin =
      T::ParentOrigin::try_successful_origin().expect("ParentOrigin must have a successful origin");

    #[extrinsic_call]
    rebalance(origin, None, 0, 0, alloc::vec::Vec::new());
  }

  #[benchmark]
  fn set_oracle() {
    let origin =
      T::ParentOrigin::try_successful_origin().expect("ParentOrigin must have a successful origin");

    #[extrinsic_call]
    set_oracle(origin, 1);

    assert_eq!(PriceFeed::<T>::get(), 1);
  }

  #[benchmark]
  fn collect() {
    let base = T::BaseAsset::get();
    CollectionAllowances::<T>::insert(base, 10 * UNIT);
    let origin =
      T::ParentOrigin::try_successful_origin().expect("ParentOrigin must have a successful origin");

    #[extrinsic_call]
    collect(origin, base);

    assert_eq!(CollectionAllowances::<T>::get(base), 0);
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
