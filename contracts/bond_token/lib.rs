#![cfg_attr(not(feature = "std"), no_std)]

pub mod constants;
pub mod economics;

#[ink::contract]
mod bond_token {
    use crate::constants::*;
    use crate::economics::{buyback_payout, sale_amount, to_units};
    use core::cmp::Ordering;
    use ink::prelude::string::String;
    use ink::storage::Mapping;

    pub type Result<T> = core::result::Result<T, Error>;

    #[derive(scale::Encode, scale::Decode, Debug, PartialEq, Eq)]
    #[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
    pub enum Error {
        NotAuthorized,
        RestrictedAccount,
        InsufficientBalance,
        InsufficientAllowance,
        InsufficientReserve,
        SupplyCapExceeded,
        WrongPaymentAmount,
        AllowanceRace,
        PayoutFailed,
        Overflow,
    }

    #[ink(event)]
    pub struct Transferred {
        #[ink(topic)]
        from_acc: AccountId,
        #[ink(topic)]
        to_acc: AccountId,
        amount_val: Balance,
    }

    #[ink(event)]
    pub struct Minted {
        #[ink(topic)]
        to_acc: AccountId,
        amount_val: Balance,
    }

    #[ink(event)]
    pub struct Burned {
        #[ink(topic)]
        from_acc: AccountId,
        amount_val: Balance,
    }

    #[ink(event)]
    pub struct Approved {
        #[ink(topic)]
        owner_acc: AccountId,
        #[ink(topic)]
        spender_acc: AccountId,
        amount_val: Balance,
    }

    #[ink(event)]
    pub struct RestrictionSet {
        #[ink(topic)]
        target_acc: AccountId,
        restricted_flag: bool,
    }

    /// A `buy()` went through. `token_count` is in whole tokens.
    #[ink(event)]
    pub struct Sold {
        #[ink(topic)]
        buyer_acc: AccountId,
        token_count: Balance,
    }

    #[ink(event)]
    pub struct BoughtBack {
        #[ink(topic)]
        seller_acc: AccountId,
        token_count: Balance,
        payout_val: Balance,
    }

    #[ink(event)]
    pub struct ReserveWithdrawn {
        #[ink(topic)]
        to_acc: AccountId,
        amount_val: Balance,
    }

    #[ink(storage)]
    pub struct BondToken {
        // governance / control
        authority_acc: AccountId,
        restricted: Mapping<AccountId, bool>,

        // token state
        total_supply: Balance,
        balances: Mapping<AccountId, Balance>,
        allowances: Mapping<(AccountId, AccountId), Balance>,
    }

    impl BondToken {
        // -------- constructors --------

        /// The deployer becomes the authority for the life of the contract.
        #[ink(constructor)]
        pub fn new() -> Self {
            Self {
                authority_acc: Self::env().caller(),
                restricted: Mapping::default(),
                total_supply: 0,
                balances: Mapping::default(),
                allowances: Mapping::default(),
            }
        }

        // -------- modifiers (helpers) --------

        fn only_authority(&self) -> Result<()> {
            if self.env().caller() != self.authority_acc {
                return Err(Error::NotAuthorized)
            }
            Ok(())
        }

        fn ensure_unrestricted(&self, acc: AccountId) -> Result<()> {
            if self.is_restricted(acc) {
                return Err(Error::RestrictedAccount)
            }
            Ok(())
        }

        // -------- read API --------

        #[ink(message)]
        pub fn name(&self) -> String {
            String::from(TOKEN_NAME)
        }

        #[ink(message)]
        pub fn symbol(&self) -> String {
            String::from(TOKEN_SYMBOL)
        }

        #[ink(message)]
        pub fn decimals(&self) -> u8 {
            DECIMALS
        }

        #[ink(message)]
        pub fn max_supply(&self) -> Balance {
            MAX_SUPPLY
        }

        #[ink(message)]
        pub fn total_supply(&self) -> Balance {
            self.total_supply
        }

        #[ink(message)]
        pub fn balance_of(&self, owner_acc: AccountId) -> Balance {
            self.balances.get(owner_acc).unwrap_or(0)
        }

        #[ink(message)]
        pub fn my_balance(&self) -> Balance {
            let caller_acc = self.env().caller();
            self.balance_of(caller_acc)
        }

        #[ink(message)]
        pub fn allowance(&self, owner_acc: AccountId, spender_acc: AccountId) -> Balance {
            self.allowances.get((owner_acc, spender_acc)).unwrap_or(0)
        }

        #[ink(message)]
        pub fn authority(&self) -> AccountId {
            self.authority_acc
        }

        #[ink(message)]
        pub fn is_restricted(&self, acc: AccountId) -> bool {
            self.restricted.get(acc).unwrap_or(false)
        }

        /// Native currency currently held by the contract.
        #[ink(message)]
        pub fn reserve(&self) -> Balance {
            self.env().balance()
        }

        // -------- holder API --------

        #[ink(message)]
        pub fn transfer(&mut self, to_acc: AccountId, amount_val: Balance) -> Result<()> {
            let from_acc = self.env().caller();
            self.move_balance(from_acc, to_acc, amount_val)
        }

        #[ink(message)]
        pub fn approve(&mut self, spender_acc: AccountId, amount_val: Balance) -> Result<()> {
            let owner_acc = self.env().caller();
            let current_val = self.allowance(owner_acc, spender_acc);
            // Safe-approve: forbid nonzero -> nonzero without zeroing first
            if current_val != 0 && amount_val != 0 {
                return Err(Error::AllowanceRace)
            }
            self.allowances.insert((owner_acc, spender_acc), &amount_val);
            self.env().emit_event(Approved { owner_acc, spender_acc, amount_val });
            Ok(())
        }

        #[ink(message)]
        pub fn increase_allowance(&mut self, spender_acc: AccountId, add_val: Balance) -> Result<()> {
            let owner_acc = self.env().caller();
            let current_val = self.allowance(owner_acc, spender_acc);
            let amount_val = current_val.checked_add(add_val).ok_or(Error::Overflow)?;
            self.allowances.insert((owner_acc, spender_acc), &amount_val);
            self.env().emit_event(Approved { owner_acc, spender_acc, amount_val });
            Ok(())
        }

        #[ink(message)]
        pub fn decrease_allowance(&mut self, spender_acc: AccountId, sub_val: Balance) -> Result<()> {
            let owner_acc = self.env().caller();
            let current_val = self.allowance(owner_acc, spender_acc);
            let amount_val = current_val.saturating_sub(sub_val);
            self.allowances.insert((owner_acc, spender_acc), &amount_val);
            self.env().emit_event(Approved { owner_acc, spender_acc, amount_val });
            Ok(())
        }

        #[ink(message)]
        pub fn transfer_from(
            &mut self,
            from_acc: AccountId,
            to_acc: AccountId,
            amount_val: Balance,
        ) -> Result<()> {
            let caller_acc = self.env().caller();
            let current_allow = self.allowance(from_acc, caller_acc);
            if current_allow < amount_val {
                return Err(Error::InsufficientAllowance)
            }

            self.move_balance(from_acc, to_acc, amount_val)?;

            // Reduce allowance last so a failed move leaves it intact
            let new_allow = current_allow.checked_sub(amount_val).ok_or(Error::Overflow)?;
            self.allowances.insert((from_acc, caller_acc), &new_allow);
            Ok(())
        }

        // -------- sale / buy-back --------

        /// Pays exactly `SALE_PRICE` for `SALE_TOKENS` tokens.
        ///
        /// Repurchased inventory held by the contract is handed out first;
        /// fresh supply is minted only when the inventory can't cover a sale.
        /// Any error reverts the call, refunding the payment.
        #[ink(message, payable)]
        pub fn buy(&mut self) -> Result<()> {
            if self.env().transferred_value() != SALE_PRICE {
                return Err(Error::WrongPaymentAmount)
            }
            let buyer_acc = self.env().caller();
            let self_acc = self.env().account_id();
            let sale_val = sale_amount();

            if self.balance_of(self_acc) < sale_val {
                self.mint_internal(buyer_acc, sale_val)?;
            } else {
                self.move_balance(self_acc, buyer_acc, sale_val)?;
            }

            self.env().emit_event(Sold { buyer_acc, token_count: SALE_TOKENS });
            Ok(())
        }

        /// Sells `token_count` whole tokens back to the contract.
        ///
        /// The reserve is checked before the tokens move; the payout is sent
        /// only after the ledger has been updated.
        #[ink(message)]
        pub fn sell_back(&mut self, token_count: Balance) -> Result<()> {
            let seller_acc = self.env().caller();
            let self_acc = self.env().account_id();

            let payout_val = buyback_payout(token_count).ok_or(Error::Overflow)?;
            if self.env().balance() < payout_val {
                return Err(Error::InsufficientReserve)
            }
            let amount_val = to_units(token_count).ok_or(Error::Overflow)?;

            self.move_balance(seller_acc, self_acc, amount_val)?;
            self.disburse(seller_acc, payout_val)?;

            self.env().emit_event(BoughtBack { seller_acc, token_count, payout_val });
            Ok(())
        }

        // -------- authority API --------

        #[ink(message)]
        pub fn mint_to(&mut self, recipient_acc: AccountId, token_count: Balance) -> Result<()> {
            self.only_authority()?;
            let amount_val = to_units(token_count).ok_or(Error::Overflow)?;
            self.mint_internal(recipient_acc, amount_val)
        }

        /// Forces `target_acc` to hold exactly `token_count` whole tokens.
        #[ink(message)]
        pub fn set_balance(&mut self, target_acc: AccountId, token_count: Balance) -> Result<()> {
            self.only_authority()?;
            let target_val = to_units(token_count).ok_or(Error::Overflow)?;
            let current_val = self.balance_of(target_acc);

            match current_val.cmp(&target_val) {
                Ordering::Greater => self.burn_internal(target_acc, current_val - target_val),
                Ordering::Less => self.mint_internal(target_acc, target_val - current_val),
                Ordering::Equal => Ok(()),
            }
        }

        #[ink(message)]
        pub fn seize_all(&mut self, from_acc: AccountId, to_acc: AccountId) -> Result<()> {
            self.only_authority()?;
            let amount_val = self.balance_of(from_acc);
            self.move_balance(from_acc, to_acc, amount_val)
        }

        #[ink(message)]
        pub fn add_restriction(&mut self, target_acc: AccountId) -> Result<()> {
            self.only_authority()?;
            self.restricted.insert(target_acc, &true);
            self.env().emit_event(RestrictionSet { target_acc, restricted_flag: true });
            Ok(())
        }

        #[ink(message)]
        pub fn remove_restriction(&mut self, target_acc: AccountId) -> Result<()> {
            self.only_authority()?;
            self.restricted.remove(target_acc);
            self.env().emit_event(RestrictionSet { target_acc, restricted_flag: false });
            Ok(())
        }

        /// Sends the whole currency reserve to the authority.
        #[ink(message)]
        pub fn withdraw_reserve(&mut self) -> Result<()> {
            self.only_authority()?;
            let to_acc = self.authority_acc;
            let amount_val = self.env().balance();
            self.disburse(to_acc, amount_val)?;
            self.env().emit_event(ReserveWithdrawn { to_acc, amount_val });
            Ok(())
        }

        // ---- internals ----
        //
        // Every balance mutation goes through one of these three, and each
        // runs the restriction check before touching storage.

        fn mint_internal(&mut self, to_acc: AccountId, amount_val: Balance) -> Result<()> {
            self.ensure_unrestricted(to_acc)?;

            let new_total = self
                .total_supply
                .checked_add(amount_val)
                .ok_or(Error::SupplyCapExceeded)?;
            if new_total > MAX_SUPPLY {
                return Err(Error::SupplyCapExceeded)
            }
            let to_bal = self.balance_of(to_acc);
            let new_to = to_bal.checked_add(amount_val).ok_or(Error::Overflow)?;

            self.total_supply = new_total;
            self.balances.insert(to_acc, &new_to);

            self.env().emit_event(Minted { to_acc, amount_val });
            Ok(())
        }

        fn burn_internal(&mut self, from_acc: AccountId, amount_val: Balance) -> Result<()> {
            self.ensure_unrestricted(from_acc)?;

            let from_bal = self.balance_of(from_acc);
            if from_bal < amount_val {
                return Err(Error::InsufficientBalance)
            }
            let new_from = from_bal.checked_sub(amount_val).ok_or(Error::Overflow)?;
            let new_total = self.total_supply.checked_sub(amount_val).ok_or(Error::Overflow)?;

            self.balances.insert(from_acc, &new_from);
            self.total_supply = new_total;

            self.env().emit_event(Burned { from_acc, amount_val });
            Ok(())
        }

        fn move_balance(&mut self, from_acc: AccountId, to_acc: AccountId, amount_val: Balance) -> Result<()> {
            self.ensure_unrestricted(from_acc)?;
            self.ensure_unrestricted(to_acc)?;

            let from_bal = self.balance_of(from_acc);
            if from_bal < amount_val {
                return Err(Error::InsufficientBalance)
            }

            if from_acc != to_acc {
                let new_from = from_bal.checked_sub(amount_val).ok_or(Error::Overflow)?;
                let to_bal = self.balance_of(to_acc);
                let new_to = to_bal.checked_add(amount_val).ok_or(Error::Overflow)?;
                self.balances.insert(from_acc, &new_from);
                self.balances.insert(to_acc, &new_to);
            }

            self.env().emit_event(Transferred { from_acc, to_acc, amount_val });
            Ok(())
        }

        /// Native currency payout. Callers run this after all ledger writes.
        fn disburse(&mut self, to_acc: AccountId, amount_val: Balance) -> Result<()> {
            if amount_val == 0 {
                return Ok(())
            }
            self.env()
                .transfer(to_acc, amount_val)
                .map_err(|_| Error::PayoutFailed)
        }
    }


    #[cfg(all(test, feature = "e2e-tests"))]
    mod e2e_tests {
        use super::*;
        use ink_e2e::{ChainBackend, ContractsBackend};

        type E2EResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

        #[ink_e2e::test]
        async fn failed_buy_refunds_payment<Client: E2EBackend>(mut client: Client) -> E2EResult<()> {
            let mut constructor = BondTokenRef::new();
            let contract = client
                .instantiate("bond_token", &ink_e2e::alice(), &mut constructor)
                .submit()
                .await
                .expect("instantiate failed");
            let mut call_builder = contract.call_builder::<BondToken>();

            let alice_acc = ink_e2e::account_id(ink_e2e::AccountKeyring::Alice);
            let bob_acc = ink_e2e::account_id(ink_e2e::AccountKeyring::Bob);

            let mint = call_builder.mint_to(alice_acc, 999_950);
            client
                .call(&ink_e2e::alice(), &mint)
                .submit()
                .await
                .expect("mint failed");

            let reserve_before = client.free_balance(contract.account_id).await?;
            let bob_before = client.free_balance(bob_acc).await?;

            let buy = call_builder.buy();
            let dry_run = client
                .call(&ink_e2e::bob(), &buy)
                .value(SALE_PRICE)
                .dry_run()
                .await?;
            assert_eq!(dry_run.return_value(), Err(Error::SupplyCapExceeded));

            // A reverting call may be refused before inclusion or included as
            // reverted; neither path may keep the payment.
            let submitted = client
                .call(&ink_e2e::bob(), &buy)
                .value(SALE_PRICE)
                .submit()
                .await;
            if let Ok(result) = submitted {
                assert_eq!(result.return_value(), Err(Error::SupplyCapExceeded));
            }

            let reserve_after = client.free_balance(contract.account_id).await?;
            let bob_after = client.free_balance(bob_acc).await?;
            assert_eq!(reserve_after, reserve_before);
            assert!(bob_after <= bob_before);
            // only fees may be missing, never the price
            assert!(bob_before - bob_after < SALE_PRICE / 10);

            let supply = call_builder.total_supply();
            let supply_val = client.call(&ink_e2e::bob(), &supply).dry_run().await?.return_value();
            assert_eq!(supply_val, 999_950 * UNIT);
            let bob_tokens = call_builder.balance_of(bob_acc);
            let bob_tokens_val = client.call(&ink_e2e::bob(), &bob_tokens).dry_run().await?.return_value();
            assert_eq!(bob_tokens_val, 0);

            Ok(())
        }
    }
}
